use serde_json::{Map, Value};

pub type BusState = Map<String, Value>;

/// Structural diff of `current` against `previous`.
///
/// Keys of `current` are kept when their value differs from `previous` or is
/// missing there. When both sides hold an object the key is kept only if the
/// nested diff is non-empty, and the nested diff becomes its value.
pub fn diff(previous: &BusState, current: &BusState) -> BusState {
    let mut result = Map::new();

    for (key, value) in current {
        match (previous.get(key), value) {
            (Some(Value::Object(prev)), Value::Object(curr)) => {
                let nested = diff(prev, curr);
                if !nested.is_empty() {
                    result.insert(key.clone(), Value::Object(nested));
                }
            }
            (Some(prev), curr) if prev == curr => {}
            (_, curr) => {
                result.insert(key.clone(), curr.clone());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> BusState {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn identical_states_have_empty_diff() {
        let s = state(json!({"a/mode": "heat", "a/attributes": {"hold_heat": "Permanent Hold"}}));
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn nested_change_keeps_only_that_branch() {
        let prev = state(json!({
            "a/mode": "heat",
            "a/attributes": {"hold_heat": "Permanent Hold", "hold_cool": "Permanent Hold"}
        }));
        let curr = state(json!({
            "a/mode": "heat",
            "a/attributes": {"hold_heat": "Temporary Hold", "hold_cool": "Permanent Hold"}
        }));

        assert_eq!(
            Value::Object(diff(&prev, &curr)),
            json!({"a/attributes": {"hold_heat": "Temporary Hold"}})
        );
    }

    #[test]
    fn new_and_retyped_keys_are_included() {
        let prev = state(json!({"a/status": "Okay", "a/current": {"x": 1}}));
        let curr = state(json!({"a/status": "Okay", "a/current": "60", "a/mode": "off"}));

        assert_eq!(
            Value::Object(diff(&prev, &curr)),
            json!({"a/current": "60", "a/mode": "off"})
        );
    }

    #[test]
    fn everything_differs_from_empty_baseline() {
        let curr = state(json!({"a/mode": "heat", "a/attributes": {"x": 1}}));
        assert_eq!(diff(&Map::new(), &curr), curr);
    }
}
