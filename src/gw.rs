//! Protobuf schema for concentrator daemon payloads.
//!
//! These are the messages carried in the payload frame of the event and
//! command channels. They are hand-written prost derives so the schema
//! lives next to the code that speaks it; field numbers are part of the
//! wire contract and must never be reused.

use std::collections::HashMap;

use prost::{Enumeration, Message, Oneof};

/// CRC state reported by the concentrator for a received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum CrcStatus {
    NoCrc = 0,
    BadCrc = 1,
    CrcOk = 2,
}

/// Downlink scheduling mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum DownlinkTiming {
    /// Transmit as soon as the radio is free.
    Immediately = 0,
    /// Transmit `delay_ms` after the uplink referenced by `context`.
    Delay = 1,
    /// Transmit at a GPS-epoch timestamp carried in `context`.
    GpsEpoch = 2,
}

/// Modulation parameters, one variant per scheme.
///
/// Shared between uplink and downlink TX info; both embed it under the
/// same field numbers.
#[derive(Clone, PartialEq, Oneof)]
pub enum ModulationInfo {
    #[prost(message, tag = "2")]
    Lora(LoraModulationInfo),
    #[prost(message, tag = "3")]
    Fsk(FskModulationInfo),
}

/// LoRa modulation parameters.
#[derive(Clone, PartialEq, Message)]
pub struct LoraModulationInfo {
    /// Bandwidth in kHz. The concentrator daemon itself speaks Hz; the
    /// bridge converts at the boundary in both directions.
    #[prost(uint32, tag = "1")]
    pub bandwidth: u32,
    #[prost(uint32, tag = "2")]
    pub spreading_factor: u32,
    /// Coding rate, e.g. "4/5".
    #[prost(string, tag = "3")]
    pub code_rate: String,
    #[prost(bool, tag = "4")]
    pub polarization_inversion: bool,
}

/// FSK modulation parameters.
#[derive(Clone, PartialEq, Message)]
pub struct FskModulationInfo {
    /// Frequency deviation in Hz.
    #[prost(uint32, tag = "1")]
    pub frequency_deviation: u32,
    /// Bitrate in bits per second.
    #[prost(uint32, tag = "2")]
    pub datarate: u32,
}

/// Transmit metadata of a received uplink.
#[derive(Clone, PartialEq, Message)]
pub struct UplinkTxInfo {
    /// Center frequency in Hz.
    #[prost(uint32, tag = "1")]
    pub frequency: u32,
    #[prost(oneof = "ModulationInfo", tags = "2, 3")]
    pub modulation_info: Option<ModulationInfo>,
}

impl UplinkTxInfo {
    pub fn lora_modulation_info(&self) -> Option<&LoraModulationInfo> {
        match &self.modulation_info {
            Some(ModulationInfo::Lora(info)) => Some(info),
            _ => None,
        }
    }

    pub fn lora_modulation_info_mut(&mut self) -> Option<&mut LoraModulationInfo> {
        match &mut self.modulation_info {
            Some(ModulationInfo::Lora(info)) => Some(info),
            _ => None,
        }
    }
}

/// Receive metadata of an uplink as seen by one radio chain.
#[derive(Clone, PartialEq, Message)]
pub struct UplinkRxInfo {
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub gateway_id: Vec<u8>,
    /// Random identifier assigned by the concentrator, 16 bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub uplink_id: Vec<u8>,
    /// RSSI in dBm.
    #[prost(int32, tag = "3")]
    pub rssi: i32,
    /// SNR in dB (LoRa only).
    #[prost(double, tag = "4")]
    pub lora_snr: f64,
    #[prost(uint32, tag = "5")]
    pub channel: u32,
    #[prost(uint32, tag = "6")]
    pub rf_chain: u32,
    #[prost(uint32, tag = "7")]
    pub board: u32,
    #[prost(uint32, tag = "8")]
    pub antenna: u32,
    /// Opaque concentrator context, echoed back for downlink timing.
    #[prost(bytes = "vec", tag = "9")]
    pub context: Vec<u8>,
    #[prost(enumeration = "CrcStatus", tag = "10")]
    pub crc_status: i32,
}

/// A radio frame received by the gateway.
#[derive(Clone, PartialEq, Message)]
pub struct UplinkFrame {
    /// PHY payload as it came off the air.
    #[prost(bytes = "vec", tag = "1")]
    pub phy_payload: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub tx_info: Option<UplinkTxInfo>,
    #[prost(message, optional, tag = "3")]
    pub rx_info: Option<UplinkRxInfo>,
}

/// Periodic health and traffic counters from the concentrator.
#[derive(Clone, PartialEq, Message)]
pub struct GatewayStats {
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub gateway_id: Vec<u8>,
    /// Random identifier assigned by the concentrator, 16 bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub stats_id: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub rx_packets_received: u32,
    #[prost(uint32, tag = "4")]
    pub rx_packets_received_ok: u32,
    #[prost(uint32, tag = "5")]
    pub tx_packets_received: u32,
    #[prost(uint32, tag = "6")]
    pub tx_packets_emitted: u32,
    #[prost(map = "string, string", tag = "7")]
    pub meta_data: HashMap<String, String>,
}

/// Transmit parameters for a downlink.
#[derive(Clone, PartialEq, Message)]
pub struct DownlinkTxInfo {
    /// Center frequency in Hz.
    #[prost(uint32, tag = "1")]
    pub frequency: u32,
    #[prost(oneof = "ModulationInfo", tags = "2, 3")]
    pub modulation_info: Option<ModulationInfo>,
    /// TX power in dBm.
    #[prost(int32, tag = "4")]
    pub power: i32,
    #[prost(uint32, tag = "5")]
    pub board: u32,
    #[prost(uint32, tag = "6")]
    pub antenna: u32,
    #[prost(enumeration = "DownlinkTiming", tag = "7")]
    pub timing: i32,
    /// Delay in milliseconds relative to `context` (Delay timing only).
    #[prost(uint32, tag = "8")]
    pub delay_ms: u32,
    /// Concentrator context of the uplink this downlink answers.
    #[prost(bytes = "vec", tag = "9")]
    pub context: Vec<u8>,
}

impl DownlinkTxInfo {
    pub fn lora_modulation_info(&self) -> Option<&LoraModulationInfo> {
        match &self.modulation_info {
            Some(ModulationInfo::Lora(info)) => Some(info),
            _ => None,
        }
    }

    pub fn lora_modulation_info_mut(&mut self) -> Option<&mut LoraModulationInfo> {
        match &mut self.modulation_info {
            Some(ModulationInfo::Lora(info)) => Some(info),
            _ => None,
        }
    }
}

/// A transmission request for the gateway.
#[derive(Clone, PartialEq, Message)]
pub struct DownlinkFrame {
    /// Random identifier assigned by the network server, 16 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub downlink_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub phy_payload: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub tx_info: Option<DownlinkTxInfo>,
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "4")]
    pub gateway_id: Vec<u8>,
}

/// The concentrator's answer to a downlink command.
#[derive(Clone, PartialEq, Message)]
pub struct DownlinkTxAck {
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub gateway_id: Vec<u8>,
    /// Identifier of the downlink this acknowledges, 16 bytes.
    #[prost(bytes = "vec", tag = "2")]
    pub downlink_id: Vec<u8>,
    /// Empty when the frame was accepted, otherwise the rejection reason
    /// (e.g. "TOO_LATE", "TX_FREQ").
    #[prost(string, tag = "3")]
    pub error: String,
}

/// Gateway-level configuration pushed from the network side.
///
/// The concentrator daemon manages its own radio configuration, so the
/// bridge accepts these and does nothing with them.
#[derive(Clone, PartialEq, Message)]
pub struct GatewayConfiguration {
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub gateway_id: Vec<u8>,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(uint32, tag = "3")]
    pub stats_interval_secs: u32,
}

/// Raw pass-through command for packet-forwarder style backends.
///
/// Not supported by the concentrator transport; present for interface
/// parity only.
#[derive(Clone, PartialEq, Message)]
pub struct RawPacketForwarderCommand {
    /// Gateway EUI, 8 bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub gateway_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uplink_frame_roundtrip_keeps_modulation() {
        let frame = UplinkFrame {
            phy_payload: vec![0x40, 0x01, 0x02, 0x03],
            tx_info: Some(UplinkTxInfo {
                frequency: 868_100_000,
                modulation_info: Some(ModulationInfo::Lora(LoraModulationInfo {
                    bandwidth: 125_000,
                    spreading_factor: 7,
                    code_rate: "4/5".to_string(),
                    polarization_inversion: false,
                })),
            }),
            rx_info: Some(UplinkRxInfo {
                gateway_id: vec![1, 2, 3, 4, 5, 6, 7, 8],
                uplink_id: uuid::Uuid::new_v4().as_bytes().to_vec(),
                rssi: -107,
                lora_snr: 5.5,
                channel: 2,
                crc_status: CrcStatus::CrcOk as i32,
                ..Default::default()
            }),
        };

        let encoded = frame.encode_to_vec();
        let decoded = UplinkFrame::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(
            decoded.tx_info.unwrap().lora_modulation_info().unwrap().bandwidth,
            125_000
        );
    }

    #[test]
    fn unknown_crc_value_reads_as_no_crc() {
        let rx = UplinkRxInfo {
            crc_status: 99,
            ..Default::default()
        };
        assert_eq!(rx.crc_status(), CrcStatus::NoCrc);
    }

    #[test]
    fn fsk_modulation_is_not_lora() {
        let tx = UplinkTxInfo {
            frequency: 868_800_000,
            modulation_info: Some(ModulationInfo::Fsk(FskModulationInfo {
                frequency_deviation: 25_000,
                datarate: 50_000,
            })),
        };
        assert!(tx.lora_modulation_info().is_none());
    }
}
