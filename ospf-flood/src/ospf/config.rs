use serde::Deserialize;

/// Protocol timers in seconds. Unset fields fall back to the RFC 2328
/// architectural constants.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OspfConfig {
    pub rxmt_interval: Option<u16>,
    pub min_ls_arrival: Option<u16>,
    pub max_age_diff: Option<u16>,
    pub ls_refresh_time: Option<u16>,
    pub inf_trans_delay: Option<u16>,
    pub ack_delay: Option<u16>,
    pub maxage_walker_interval: Option<u16>,
}

const DEFAULT_RXMT_INTERVAL: u64 = 5;
const DEFAULT_MIN_LS_ARRIVAL: u64 = 1;
const DEFAULT_MAX_AGE_DIFF: u16 = 900;
const DEFAULT_LS_REFRESH_TIME: u64 = 1800;
const DEFAULT_INF_TRANS_DELAY: u16 = 1;
const DEFAULT_ACK_DELAY: u64 = 1;
const DEFAULT_MAXAGE_WALKER_INTERVAL: u64 = 10;

impl OspfConfig {
    pub fn rxmt_interval(&self) -> u64 {
        if let Some(rxmt_interval) = self.rxmt_interval {
            rxmt_interval.max(1) as u64
        } else {
            DEFAULT_RXMT_INTERVAL
        }
    }

    pub fn min_ls_arrival(&self) -> u64 {
        if let Some(min_ls_arrival) = self.min_ls_arrival {
            min_ls_arrival as u64
        } else {
            DEFAULT_MIN_LS_ARRIVAL
        }
    }

    pub fn max_age_diff(&self) -> u16 {
        self.max_age_diff.unwrap_or(DEFAULT_MAX_AGE_DIFF)
    }

    pub fn ls_refresh_time(&self) -> u64 {
        if let Some(ls_refresh_time) = self.ls_refresh_time {
            ls_refresh_time.max(1) as u64
        } else {
            DEFAULT_LS_REFRESH_TIME
        }
    }

    pub fn inf_trans_delay(&self) -> u16 {
        self.inf_trans_delay.unwrap_or(DEFAULT_INF_TRANS_DELAY)
    }

    pub fn ack_delay(&self) -> u64 {
        if let Some(ack_delay) = self.ack_delay {
            ack_delay.max(1) as u64
        } else {
            DEFAULT_ACK_DELAY
        }
    }

    pub fn maxage_walker_interval(&self) -> u64 {
        if let Some(interval) = self.maxage_walker_interval {
            interval.max(1) as u64
        } else {
            DEFAULT_MAXAGE_WALKER_INTERVAL
        }
    }
}
