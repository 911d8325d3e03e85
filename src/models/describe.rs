//! Human-readable record representation for diagnostics.
//!
//! Each entity lists its identifying fields explicitly: the primary key by
//! default, `id` and `hostname` for hosts, `key` and `value` for host
//! variables. The output looks like `Host(id=1, hostname="web01")`.

use std::fmt::Debug;

/// Diagnostic representation built from a record's identifying fields.
pub trait Describe {
    fn describe(&self) -> String;
}

/// Formats `name(field=value, ...)` using each value's `Debug` form.
pub fn describe_fields(name: &str, fields: &[(&str, &dyn Debug)]) -> String {
    let rendered: Vec<String> = fields
        .iter()
        .map(|(field, value)| format!("{field}={value:?}"))
        .collect();
    format!("{}({})", name, rendered.join(", "))
}
