//! Conversion between JSON documents and stored values.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Map, Number, Value as Json};
use tessera_types::Kind;
use tessera_value::{
    Context, Sequence, SequenceCursor, SequenceItem, TreeBuilder, Value, ValueResult,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Build a value from JSON. Arrays become lists (or a set, for the top level
/// when `as_set`), objects become maps keyed by strings.
pub fn to_value<'a>(builder: &'a TreeBuilder, doc: &'a Json, as_set: bool) -> BoxFuture<'a, ValueResult<Value>> {
    Box::pin(async move {
        Ok(match doc {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => number(n),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(to_value(builder, item, false).await?);
                }
                if as_set {
                    builder.set(values).await?
                } else {
                    builder.list(values).await?
                }
            }
            Json::Object(fields) => {
                let mut entries = Vec::with_capacity(fields.len());
                for (k, v) in fields {
                    entries.push((Value::String(k.clone()), to_value(builder, v, false).await?));
                }
                builder.map(entries).await?
            }
        })
    })
}

fn number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        Value::Uint(u)
    } else {
        n.as_f64().map(Value::Float).unwrap_or(Value::Null)
    }
}

/// Render a value as JSON, loading every chunk of nested collections.
///
/// Maps with only string keys become objects; other maps become arrays of
/// `[key, value]` pairs. Blobs become hex strings.
pub fn to_json<'a>(ctx: &'a Context, value: &'a Value) -> BoxFuture<'a, ValueResult<Json>> {
    Box::pin(async move {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Uint(u) => Json::from(*u),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Ref(r) => json!({
                "ref": r.target().to_hex(),
                "kind": r.target_kind().to_string(),
                "height": r.height(),
            }),
            Value::Blob(seq) => {
                let bytes: Vec<u8> = all_items(ctx, seq)
                    .await?
                    .into_iter()
                    .filter_map(|item| match item {
                        SequenceItem::Byte(b) => Some(b),
                        _ => None,
                    })
                    .collect();
                Json::String(hex::encode(bytes))
            }
            Value::List(seq) | Value::Set(seq) => {
                let mut out = Vec::new();
                for item in all_items(ctx, seq).await? {
                    if let SequenceItem::Value(v) = item {
                        out.push(to_json(ctx, &v).await?);
                    }
                }
                Json::Array(out)
            }
            Value::Map(seq) => {
                let entries: Vec<(Value, Value)> = all_items(ctx, seq)
                    .await?
                    .into_iter()
                    .filter_map(|item| match item {
                        SequenceItem::Entry(k, v) => Some((k, v)),
                        _ => None,
                    })
                    .collect();
                if entries.iter().all(|(k, _)| k.kind() == Kind::String) {
                    let mut object = Map::new();
                    for (k, v) in &entries {
                        if let Value::String(key) = k {
                            object.insert(key.clone(), to_json(ctx, v).await?);
                        }
                    }
                    Json::Object(object)
                } else {
                    let mut pairs = Vec::with_capacity(entries.len());
                    for (k, v) in &entries {
                        pairs.push(Json::Array(vec![to_json(ctx, k).await?, to_json(ctx, v).await?]));
                    }
                    Json::Array(pairs)
                }
            }
        })
    })
}

async fn all_items(ctx: &Context, seq: &Arc<Sequence>) -> ValueResult<Vec<SequenceItem>> {
    let mut cursor = SequenceCursor::at_index(ctx, Arc::clone(seq), 0).await?;
    cursor.collect_forward(ctx, usize::MAX).await
}

/// One-line rendering of a cursor item; nested collections are summarized
/// without loading them.
pub fn summarize_item(item: &SequenceItem) -> String {
    match item {
        SequenceItem::Value(v) => summarize(v),
        SequenceItem::Entry(k, v) => format!("{} => {}", summarize(k), summarize(v)),
        SequenceItem::Byte(b) => format!("0x{b:02x}"),
        SequenceItem::Child(t) => format!("#{} ({} leaves)", t.target().short_hex(), t.num_leaves()),
    }
}

fn summarize(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Uint(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Ref(r) => format!("#{} ({})", r.target().short_hex(), r.target_kind()),
        other => {
            let leaves = other.as_sequence().map(|s| s.num_leaves()).unwrap_or(0);
            format!("<{} of {leaves}>", other.kind())
        }
    }
}
