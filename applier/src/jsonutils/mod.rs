pub mod fieldpath;

use serde_json::Value;

#[cfg(test)]
mod tests;

// JSON-Pointer escaping per RFC 6901; annotation keys routinely contain '/'
// so this is load-bearing, not cosmetic.
pub fn escape(path: &str) -> String {
    let path = path.replace('~', "~0");
    path.replace('/', "~1")
}

pub fn unescape(token: &str) -> String {
    let token = token.replace("~1", "/");
    token.replace("~0", "~")
}

// "/a/b" -> ["a", "b"]; the empty pointer refers to the whole document
pub fn split_pointer(path: &str) -> Vec<String> {
    if path.is_empty() {
        return vec![];
    }
    path.trim_start_matches('/').split('/').map(unescape).collect()
}

// Remove the value at `path`, tolerating paths that don't exist; the diff
// pipeline strips ignore-paths from both sides of a comparison and either side
// may simply not have the field.
pub fn remove_path(obj: &mut Value, path: &str) {
    let tokens = split_pointer(path);
    let Some((last, parents)) = tokens.split_last() else {
        *obj = Value::Null;
        return;
    };

    let mut node = obj;
    for tok in parents {
        node = match node {
            Value::Object(map) => match map.get_mut(tok) {
                Some(v) => v,
                None => return,
            },
            Value::Array(vec) => match tok.parse::<usize>().ok().and_then(|i| vec.get_mut(i)) {
                Some(v) => v,
                None => return,
            },
            _ => return,
        };
    }

    match node {
        Value::Object(map) => {
            map.remove(last);
        },
        Value::Array(vec) => {
            if let Ok(i) = last.parse::<usize>()
                && i < vec.len()
            {
                vec.remove(i);
            }
        },
        _ => (),
    }
}

fn is_empty_container(v: &Value) -> bool {
    match v {
        Value::Object(map) => map.is_empty(),
        Value::Array(vec) => vec.is_empty(),
        _ => false,
    }
}

fn num_eq(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    // unstructured round-trips flip between integer and float representations
    // of the same number, so compare numerically
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => x == y,
    }
}

// Semantic deep-equality: numbers compare across int/float representations,
// and absent maps/lists are equivalent to empty ones (the apiserver drops
// empty containers at will).
pub fn semantic_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, other) | (other, Value::Null) => is_empty_container(other),
        (Value::Number(x), Value::Number(y)) => num_eq(x, y),
        (Value::Object(x), Value::Object(y)) => {
            x.keys().chain(y.keys()).all(|k| {
                semantic_eq(x.get(k).unwrap_or(&Value::Null), y.get(k).unwrap_or(&Value::Null))
            })
        },
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(v, w)| semantic_eq(v, w)),
        _ => a == b,
    }
}

// Semantic deep-derivative: every field `sub` specifies must be present (and
// semantically equal) in `sup`; fields `sub` leaves out match anything.  Used
// for labels/annotations, where cluster controllers inject extra entries that
// must not read as drift.  NOT interchangeable with semantic_eq.
pub fn semantic_derivative(sub: &Value, sup: &Value) -> bool {
    match (sub, sup) {
        (Value::Null, _) => true,
        (Value::Object(s), Value::Object(l)) => {
            s.iter().all(|(k, v)| semantic_derivative(v, l.get(k).unwrap_or(&Value::Null)))
        },
        (Value::Array(s), Value::Array(l)) => {
            s.len() == l.len() && s.iter().zip(l).all(|(v, w)| semantic_derivative(v, w))
        },
        (Value::Number(x), Value::Number(y)) => num_eq(x, y),
        (other, Value::Null) => is_empty_container(other),
        _ => sub == sup,
    }
}
