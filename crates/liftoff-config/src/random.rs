//! Values for the `random` layer.
//!
//! Supported keys: `random.int`, `random.long`, `random.uuid`, ranged forms
//! such as `random.int(10)` or `random.long[1024,65536]`, and any other
//! `random.*` key, which yields 32 random hex digits.

use rand::Rng;
use uuid::Uuid;

const PREFIX: &str = "random.";

pub(crate) fn value(key: &str) -> Option<String> {
    let kind = key.strip_prefix(PREFIX)?;
    let mut rng = rand::thread_rng();
    if kind == "int" {
        return Some(rng.r#gen::<i32>().to_string());
    }
    if kind == "long" {
        return Some(rng.r#gen::<i64>().to_string());
    }
    if kind == "uuid" {
        return Some(Uuid::new_v4().to_string());
    }
    if let Some(range) = kind.strip_prefix("int") {
        let (min, max) = parse_range(range)?;
        let min = i32::try_from(min).ok()?;
        let max = i32::try_from(max).ok()?;
        return Some(rng.gen_range(min..max).to_string());
    }
    if let Some(range) = kind.strip_prefix("long") {
        let (min, max) = parse_range(range)?;
        return Some(rng.gen_range(min..max).to_string());
    }
    let bytes: [u8; 16] = rng.r#gen();
    Some(bytes.iter().map(|byte| format!("{byte:02x}")).collect())
}

/// Parses `(max)`, `(min,max)`, `[max]` or `[min,max]`. Empty ranges are
/// rejected.
fn parse_range(range: &str) -> Option<(i64, i64)> {
    let inner = range
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| {
            range
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
        })?;
    let (min, max) = match inner.split_once(',') {
        Some((min, max)) => (min.trim().parse().ok()?, max.trim().parse().ok()?),
        None => (0, inner.trim().parse().ok()?),
    };
    (min < max).then_some((min, max))
}
