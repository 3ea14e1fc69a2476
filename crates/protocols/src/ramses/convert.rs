use crate::error::{ProtocolError, Result};
use alloy_primitives::aliases::{I24, U160};
use alloy_primitives::{Address, U256 as AlloyU256};
use chrono::{DateTime, Utc};
use primitive_types::U256;
use std::str::FromStr;

pub fn to_alloy(value: U256) -> AlloyU256 {
    AlloyU256::from_limbs(value.0)
}

pub fn from_alloy(value: AlloyU256) -> U256 {
    U256(*value.as_limbs())
}

pub fn from_u160(value: U160) -> U256 {
    let limbs = value.as_limbs();
    U256([limbs[0], limbs[1], limbs[2], 0])
}

pub fn tick_to_i32(tick: I24) -> Result<i32> {
    i32::try_from(tick).map_err(|e| ProtocolError::Read {
        operation: "tick",
        reason: e.to_string(),
    })
}

pub fn tick_from_i32(tick: i32) -> Result<I24> {
    I24::try_from(tick).map_err(|e| ProtocolError::Write {
        operation: "tick",
        reason: format!("{tick} does not fit int24: {e}"),
    })
}

pub fn unix_deadline(deadline: DateTime<Utc>) -> AlloyU256 {
    AlloyU256::from(deadline.timestamp().max(0) as u64)
}

pub fn parse_address(field: &'static str, raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| ProtocolError::config(field, e))
}
