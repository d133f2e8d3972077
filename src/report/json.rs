//! JSON output for scripting and piping.

use serde::Serialize;

pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
