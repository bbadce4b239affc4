#![no_std]
#![no_main]

mod config;
mod radio;

use assign_resources::assign_resources;
use config::Config;
use embassy_executor::Spawner;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output, OutputOpenDrain};
use embassy_rp::peripherals;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Instant};
use radio::{LoraRadio, LoraRouting, LoraTransport, SharedRadio, REPLY_QUEUE_SIZE};
use sht_node::sensor::sht1x::Sht1x;
use sht_node::{CooperativeScheduler, NodeContext, Reply, ReplyDecoder};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

assign_resources! {
    sht: ShtRes {
        data: PIN_16,
        sck: PIN_17,
    },
    radio: RadioRes {
        busy: PIN_2,
        cs: PIN_3,
        clk: PIN_10,
        mosi: PIN_11,
        miso: PIN_12,
        rst: PIN_15,
        dio1: PIN_20,
        dma_ch0: DMA_CH0,
        dma_ch1: DMA_CH1,
        spi1: SPI1,
    }
}

type Sensor = Sht1x<OutputOpenDrain<'static>, Output<'static>, Delay>;
type Node = CooperativeScheduler<'static, Sensor, LoraRouting<'static>, LoraTransport<'static>, RoscRng>;

static CONTEXT: NodeContext = NodeContext::new();
static REPLIES: Channel<CriticalSectionRawMutex, Reply, REPLY_QUEUE_SIZE> = Channel::new();
static RADIO_CELL: StaticCell<SharedRadio> = StaticCell::new();

#[embassy_executor::main]
async fn main(s: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources! {p};

    defmt::info!("client - senses the temperature and humidity and transmits");

    let sensor = Sht1x::new(
        OutputOpenDrain::new(r.sht.data, Level::High),
        Output::new(r.sht.sck, Level::Low),
        Delay,
    );
    let radio = LoraRadio::try_new(r.radio).await.expect("radio module should be connected");
    let radio: &'static SharedRadio = RADIO_CELL.init(Mutex::new(radio));
    let transport =
        LoraTransport::new(radio, REPLIES.sender(), &Config::NODE).expect("node ports should be valid fports");

    let node = CooperativeScheduler::new(
        &CONTEXT,
        Config::NODE,
        sensor,
        LoraRouting::new(radio),
        transport,
        RoscRng,
        Instant::now(),
    );

    s.spawn(session(radio)).expect("executor should be initialized");
    s.spawn(reply_handler()).expect("executor should be initialized");
    s.spawn(orchestrator(node)).expect("executor should be initialized");
}

#[embassy_executor::task]
async fn orchestrator(mut node: Node) {
    node.run().await
}

#[embassy_executor::task]
async fn session(radio: &'static SharedRadio) {
    radio::maintain_session(radio).await
}

#[embassy_executor::task]
async fn reply_handler() {
    ReplyDecoder::new(&CONTEXT).run(REPLIES.receiver()).await
}
