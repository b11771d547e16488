//! Names of ground atoms and ground actions in the generated model.
//!
//! The target language does not accept `-` in identifiers: every `-` is replaced by `_` and the
//! symbol is joined with its arguments, e.g. `(on-table b-1)` becomes `on_table_b_1`.

pub fn sanitize(name: &str) -> String {
    name.replace('-', "_")
}

/// Name of a symbol applied to the given arguments. Without arguments the (sanitized) symbol is used unchanged.
pub fn ground_name<S: AsRef<str>>(symbol: &str, args: &[S]) -> String {
    let mut name = sanitize(symbol);
    for arg in args {
        name.push('_');
        name.push_str(&sanitize(arg.as_ref()));
    }
    name
}
