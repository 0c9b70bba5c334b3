//! Network state and the photo download gate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use coworkers_core::PhotoSync;

/// What kind of network is currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Offline,
    Metered,
    #[default]
    Unmetered,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkState::Offline => write!(f, "offline"),
            NetworkState::Metered => write!(f, "metered"),
            NetworkState::Unmetered => write!(f, "unmetered"),
        }
    }
}

impl FromStr for NetworkState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "metered" => Ok(Self::Metered),
            "unmetered" => Ok(Self::Unmetered),
            other => Err(format!(
                "unknown network state '{other}' (expected offline, metered, unmetered)"
            )),
        }
    }
}

/// Source of the current [`NetworkState`].
pub trait Connectivity {
    fn state(&self) -> NetworkState;
}

/// A fixed network state, taken from a command-line flag or configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConnectivity(pub NetworkState);

impl Connectivity for StaticConnectivity {
    fn state(&self) -> NetworkState {
        self.0
    }
}

/// Whether photos may be downloaded under `policy` on `state`.
pub fn is_suitable(policy: PhotoSync, state: NetworkState) -> bool {
    match state {
        NetworkState::Offline => false,
        NetworkState::Metered => policy.allows_metered(),
        NetworkState::Unmetered => true,
    }
}
