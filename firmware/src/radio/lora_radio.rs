use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::SPI1;
use embassy_rp::spi::{self, Config, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use lora_phy::iv::GenericSx126xInterfaceVariant;
use lora_phy::lorawan_radio::LorawanRadio;
use lora_phy::mod_params::RadioError;
use lora_phy::sx126x::{self, Sx1262, Sx126x, TcxoCtrlVoltage};
use lora_phy::LoRa;
use lorawan_device::async_device::{self, EmbassyTimer, JoinResponse, SendResponse};
use lorawan_device::{region, AppEui, AppKey, DevEui, JoinMode};
use sht_node::Reply;

use crate::{config, RadioRes};

type SX1262 = lorawan_device::async_device::Device<
    LorawanRadio<
        Sx126x<
            ExclusiveDevice<Spi<'static, SPI1, spi::Async>, Output<'static>, Delay>,
            GenericSx126xInterfaceVariant<Output<'static>, Input<'static>>,
            Sx1262,
        >,
        Delay,
        14,
    >,
    EmbassyTimer,
    RoscRng,
>;

#[derive(defmt::Format)]
pub enum LoraRadioError {
    NoJoinAccept,
    SessionExpired,
    LoRaWAN(lorawan_device::async_device::Error<lora_phy::lorawan_radio::Error>),
}

pub struct LoraRadio {
    radio: SX1262,
}

impl LoraRadio {
    pub async fn try_new(r: RadioRes) -> Result<Self, RadioError> {
        let nss = Output::new(r.cs, Level::High);
        let reset = Output::new(r.rst, Level::High);
        let dio1 = Input::new(r.dio1, Pull::None);
        let busy = Input::new(r.busy, Pull::None);
        let spi = Spi::new(r.spi1, r.clk, r.mosi, r.miso, r.dma_ch0, r.dma_ch1, Config::default());
        let spi_bus = ExclusiveDevice::new(spi, nss, Delay);
        let sx1262_config = sx126x::Config {
            chip: Sx1262,
            tcxo_ctrl: Some(TcxoCtrlVoltage::Ctrl1V7),
            use_dcdc: true,
            rx_boost: false,
        };

        let iv = GenericSx126xInterfaceVariant::new(reset, dio1, busy, None, None)?;
        let lora = LoRa::new(Sx126x::new(spi_bus, iv, sx1262_config), true, Delay).await?;
        let mut radio: LorawanRadio<_, _, 14> = lora.into();
        radio.set_rx_window_lead_time(config::Config::RX_WINDOW_LEAD_TIME);
        radio.set_rx_window_buffer(config::Config::RX_WINDOW_BUFFER);
        let region: region::Configuration = region::Configuration::new(config::Config::LORAWAN_REGION);
        let lora_radio: async_device::Device<_, _, _> = async_device::Device::new(region, radio, EmbassyTimer::new(), RoscRng);

        Ok(Self { radio: lora_radio })
    }

    pub fn is_joined(&self) -> bool {
        self.radio.get_session().is_some()
    }

    /// Address assigned by the network server during the join
    pub fn dev_addr(&self) -> Option<[u8; 4]> {
        let session = self.radio.get_session()?;
        session.devaddr.as_ref().try_into().ok()
    }

    pub async fn join_otaa(&mut self) -> Result<(), LoraRadioError> {
        let mode = JoinMode::OTAA {
            deveui: DevEui::from(config::Config::DEV_EUI),
            appeui: AppEui::from(config::Config::APP_EUI),
            appkey: AppKey::from(config::Config::APP_KEY),
        };

        match self.radio.join(&mode).await {
            Ok(JoinResponse::JoinSuccess) => Ok(()),
            Ok(JoinResponse::NoJoinAccept) => Err(LoraRadioError::NoJoinAccept),
            Err(err) => Err(LoraRadioError::LoRaWAN(err)),
        }
    }

    /// Unconfirmed uplink. Returns the downlink received in one of the
    /// following receive windows, if any, tagged with its FPort.
    pub async fn uplink(&mut self, payload: &[u8], fport: u8) -> Result<Option<Reply>, LoraRadioError> {
        match self.radio.send(payload, fport, false).await {
            Ok(SendResponse::DownlinkReceived(fcnt_down)) => {
                defmt::debug!("radio: downlink received, fcnt {=u32}", fcnt_down);
                Ok(self
                    .radio
                    .take_downlink()
                    .map(|downlink| Reply::new(u16::from(downlink.fport), &downlink.data)))
            }
            Ok(SendResponse::SessionExpired) => Err(LoraRadioError::SessionExpired),
            Ok(SendResponse::NoAck | SendResponse::RxComplete) => Ok(None),
            Err(err) => Err(LoraRadioError::LoRaWAN(err)),
        }
    }
}
