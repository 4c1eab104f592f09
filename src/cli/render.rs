//! Human renderer for CLI outputs.
//!
//! This module is pure formatting; handlers gather the data.

use crate::minter::FetchResult;

/// Labelled fetch output: the id, its circulation summary, then one line
/// per element.
pub fn render_fetch(result: &FetchResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("id: {}\n", result.id));
    if result.held {
        out.push_str("  hold: yes\n");
    }
    if let Some(circ) = &result.circulation {
        out.push_str(&format!("  circulation: {circ}\n"));
    }
    for (elem, value) in &result.bindings {
        out.push_str(&format!("  {elem}: {value}\n"));
    }
    out
}

/// Raw fetch output: values only, one per line.
pub fn render_get(result: &FetchResult) -> String {
    let mut out = String::new();
    for (_, value) in &result.bindings {
        out.push_str(value);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Circulation, Status};

    fn sample() -> FetchResult {
        FetchResult {
            id: "13030/tst394".into(),
            circulation: Some(Circulation::new(
                Status::Issued,
                "20240101000000".into(),
                "jak".into(),
                3,
            )),
            held: true,
            bindings: vec![("where".into(), "https://example.org/394".into())],
        }
    }

    #[test]
    fn labelled_lists_everything() {
        let s = render_fetch(&sample());
        assert!(s.contains("id: 13030/tst394"));
        assert!(s.contains("hold: yes"));
        assert!(s.contains("circulation: i|"));
        assert!(s.contains("where: https://example.org/394"));
    }

    #[test]
    fn raw_is_values_only() {
        assert_eq!(render_get(&sample()), "https://example.org/394\n");
    }
}
