//! Network selection and wall-clock to epoch/slot conversion.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::slashing::types::{Epoch, Slot};

pub const SECONDS_PER_SLOT: u64 = 12;
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Consensus network this signer serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Prater,
    Sepolia,
    Holesky,
    Hoodi,
}

impl Network {
    /// Beacon chain genesis time (unix seconds).
    pub fn genesis_time(self) -> u64 {
        match self {
            Self::Mainnet => 1_606_824_023,
            Self::Prater => 1_616_508_000,
            Self::Sepolia => 1_655_733_600,
            Self::Holesky => 1_695_902_400,
            Self::Hoodi => 1_742_213_400,
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "prater" | "goerli" => Ok(Self::Prater),
            "sepolia" => Ok(Self::Sepolia),
            "holesky" => Ok(Self::Holesky),
            "hoodi" => Ok(Self::Hoodi),
            other => Err(format!(
                "Invalid network '{other}'. Must be one of: mainnet, prater, sepolia, holesky, hoodi."
            )),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Prater => write!(f, "prater"),
            Self::Sepolia => write!(f, "sepolia"),
            Self::Holesky => write!(f, "holesky"),
            Self::Hoodi => write!(f, "hoodi"),
        }
    }
}

/// Current position on the beacon chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTime {
    pub epoch: Epoch,
    pub slot: Slot,
}

impl ChainTime {
    pub fn at_slot(slot: Slot) -> Self {
        Self {
            epoch: slot / SLOTS_PER_EPOCH,
            slot,
        }
    }

    pub fn at_epoch(epoch: Epoch) -> Self {
        Self {
            epoch,
            slot: epoch.saturating_mul(SLOTS_PER_EPOCH),
        }
    }
}

pub trait BeaconClock: Send + Sync {
    fn now(&self) -> ChainTime;
}

/// Clock derived from the network genesis time and the system clock.
#[derive(Debug, Clone, Copy)]
pub struct NetworkClock {
    network: Network,
}

impl NetworkClock {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Chain time at a given unix timestamp; slot 0 before genesis.
    pub fn time_at(&self, unix_seconds: i64) -> ChainTime {
        let since_genesis =
            u64::try_from(unix_seconds).unwrap_or(0).saturating_sub(self.network.genesis_time());
        ChainTime::at_slot(since_genesis / SECONDS_PER_SLOT)
    }
}

impl BeaconClock for NetworkClock {
    fn now(&self) -> ChainTime {
        self.time_at(Utc::now().timestamp())
    }
}

/// Clock pinned to a fixed chain time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub ChainTime);

impl BeaconClock for FixedClock {
    fn now(&self) -> ChainTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("HOLESKY".parse::<Network>().unwrap(), Network::Holesky);
        assert_eq!("goerli".parse::<Network>().unwrap(), Network::Prater);
        assert!("pyrmont".parse::<Network>().is_err());
    }

    #[test]
    fn test_before_genesis_is_slot_zero() {
        let clock = NetworkClock::new(Network::Mainnet);
        assert_eq!(clock.time_at(0), ChainTime::at_slot(0));
    }

    #[test]
    fn test_epoch_from_elapsed_time() {
        let clock = NetworkClock::new(Network::Mainnet);
        let genesis = i64::try_from(Network::Mainnet.genesis_time()).unwrap();

        let time = clock.time_at(genesis + 12 * 32 * 10 + 13);
        assert_eq!(time.slot, 321);
        assert_eq!(time.epoch, 10);
    }
}
