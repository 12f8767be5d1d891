use std::collections::BTreeSet;

use serde_json::{
    Map,
    Value,
};

// FieldsV1 documents are tries: {"f:metadata": {"f:labels": {"f:app": {}}}},
// where an empty object marks an owned field.  Managed-fields cleanup needs
// the set union of two such tries when it folds one manager's fields into
// another's.  The union goes through an explicit path-set representation so
// that there is exactly one code path from trie to set and back.

pub type PathSet = BTreeSet<Vec<String>>;

pub fn path_set(trie: &Value) -> PathSet {
    let mut out = PathSet::new();
    collect(&mut vec![], trie, &mut out);
    out
}

fn collect(prefix: &mut Vec<String>, node: &Value, out: &mut PathSet) {
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                prefix.push(k.clone());
                collect(prefix, v, out);
                prefix.pop();
            }
        },
        _ => {
            if !prefix.is_empty() {
                out.insert(prefix.clone());
            }
        },
    }
}

pub fn trie_from_paths(paths: &PathSet) -> Value {
    let mut root = Map::new();
    for path in paths {
        insert(&mut root, path);
    }
    Value::Object(root)
}

fn insert(map: &mut Map<String, Value>, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let entry = map.entry(head.clone()).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    insert(entry.as_object_mut().unwrap(), rest);
}

pub fn union(a: &Value, b: &Value) -> Value {
    let mut paths = path_set(a);
    paths.extend(path_set(b));
    trie_from_paths(&paths)
}
