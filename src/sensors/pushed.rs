//! Readings posted by an external sensor bridge.
//!
//! A microcontroller bridge sends `{"pir": 0|1}` and `{"rfid": "<tag>"}`
//! bodies. These helpers validate the raw JSON values; the HTTP layer then
//! writes them into [`SensorState`](super::SensorState).

use super::SensorError;
use serde_json::Value;

/// Interpret a posted PIR value.
///
/// Accepts `0`/`1`, booleans and the strings `"0"`/`"1"`. A missing value
/// reads as no motion.
pub fn parse_pir(value: Option<&Value>) -> Result<bool, SensorError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(pir)) => Ok(*pir),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(SensorError::Read(format!("PIR value must be 0 or 1, got {n}"))),
        },
        Some(Value::String(s)) => match s.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(SensorError::Read(format!(
                "PIR value must be 0 or 1, got {other:?}"
            ))),
        },
        Some(other) => Err(SensorError::Read(format!(
            "PIR value must be 0 or 1, got {other}"
        ))),
    }
}

/// Interpret a posted RFID tag. Missing, null or blank tags mean no tag.
pub fn parse_rfid(value: Option<&Value>) -> Result<Option<String>, SensorError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(tag)) => {
            let tag = tag.trim();
            Ok((!tag.is_empty()).then(|| tag.to_string()))
        }
        Some(other) => Err(SensorError::Read(format!(
            "RFID tag must be a string, got {other}"
        ))),
    }
}
