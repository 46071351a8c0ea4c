use std::collections::BTreeMap;

use serde_json::Value;

use crate::geom::RectPx;

/// Free-form properties attached to a tile, tileset, layer or map.
pub type PropertyMap = BTreeMap<String, Value>;

pub const PROP_INTERACTIVE: &str = "interactive";
pub const PROP_COLLIDABLE: &str = "isCollidable";
pub const PROP_HIT_AREA: &str = "hitArea";
pub const PROP_COLLISION_TYPE: &str = "type";

/// Looks `key` up across `sources` in order; the first source that defines
/// the key wins outright. This is a fallback chain, not a merge: a later
/// source is consulted only when every earlier one lacks the key entirely.
pub fn resolve_property<'a>(key: &str, sources: &[Option<&'a PropertyMap>]) -> Option<&'a Value> {
    sources
        .iter()
        .copied()
        .flatten()
        .find_map(|source| source.get(key))
}

pub fn resolve_bool(key: &str, sources: &[Option<&PropertyMap>]) -> Option<bool> {
    resolve_property(key, sources).and_then(Value::as_bool)
}

pub fn resolve_str<'a>(key: &str, sources: &[Option<&'a PropertyMap>]) -> Option<&'a str> {
    resolve_property(key, sources).and_then(Value::as_str)
}

/// Reads a `[x, y, width, height]` numeric array.
pub fn resolve_rect(key: &str, sources: &[Option<&PropertyMap>]) -> Option<RectPx> {
    let values = resolve_property(key, sources)?.as_array()?;
    if values.len() != 4 {
        return None;
    }
    let mut parts = [0.0f32; 4];
    for (slot, value) in parts.iter_mut().zip(values) {
        *slot = value.as_f64()? as f32;
    }
    Some(RectPx::new(parts[0], parts[1], parts[2], parts[3]))
}
