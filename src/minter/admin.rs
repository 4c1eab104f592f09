//! Admin namespace: key builders and the per-session read-through cache.
//!
//! Two namespaces share the ordered map. Admin keys start with `:/`;
//! per-identifier keys are `<id>\t<suffix>`, their reserved suffixes
//! starting with `:/` as well. Everything here deals in the raw key bytes.

use std::collections::BTreeMap;

use crate::core::{CoreError, Repertoire, Template, repertoire_by_name};
use crate::store::KvStore;

/// Admin namespace lead-in.
pub const ADMIN_PREFIX: &str = ":/";
/// Per-identifier reserved-suffix lead-in (`<id>\t:/...`).
pub const ID_ADMIN_PREFIX: &str = "\t:/";

// Admin variable names.
pub const TEMPLATE: &str = "template";
pub const PREFIX: &str = "prefix";
pub const MASK: &str = "mask";
pub const FIRSTPART: &str = "firstpart";
pub const GENERATOR_TYPE: &str = "generator_type";
pub const GENERATOR_RANDOM: &str = "generator_random";
pub const TOTAL: &str = "total";
pub const OATOP: &str = "oatop";
pub const OACOUNTER: &str = "oacounter";
pub const PADWIDTH: &str = "padwidth";
pub const PERCOUNTER: &str = "percounter";
pub const LONGTERM: &str = "longterm";
pub const WRAP: &str = "wrap";
pub const ADDCHECKCHAR: &str = "addcheckchar";
pub const CHECKREPERTOIRE: &str = "checkrepertoire";
pub const CHECKALPHABET: &str = "checkalphabet";
pub const NAAN: &str = "naan";
pub const NAA: &str = "naa";
pub const SUBNAA: &str = "subnaa";
pub const PROPERTIES: &str = "properties";
pub const GENONLY: &str = "genonly";
pub const CREATED: &str = "created";
pub const SACLIST: &str = "saclist";
pub const SICLIST: &str = "siclist";
pub const HELD: &str = "held";
pub const QUEUED: &str = "queued";
pub const PREGENERATED: &str = "pregenerated";
pub const FSEQNUM: &str = "fseqnum";
pub const GSEQNUM: &str = "gseqnum";
pub const GSEQNUM_DATE: &str = "gseqnum_date";
pub const PREGEN_HEAD: &str = "pregen_head";
pub const PREGEN_TAIL: &str = "pregen_tail";

/// Admin variables cached at open. Everything else is mutable and read
/// through to storage.
pub const CACHED: &[&str] = &[
    TEMPLATE,
    PREFIX,
    MASK,
    FIRSTPART,
    GENERATOR_TYPE,
    GENERATOR_RANDOM,
    TOTAL,
    OATOP,
    PADWIDTH,
    PERCOUNTER,
    LONGTERM,
    WRAP,
    ADDCHECKCHAR,
    CHECKREPERTOIRE,
    CHECKALPHABET,
    NAAN,
    NAA,
    SUBNAA,
    PROPERTIES,
    GENONLY,
    CREATED,
];

/// `:/name`
pub fn akey(name: &str) -> Vec<u8> {
    format!("{ADMIN_PREFIX}{name}").into_bytes()
}

/// `:/c<i>/value`
pub fn counter_value_key(i: u64) -> Vec<u8> {
    format!("{ADMIN_PREFIX}c{i}/value").into_bytes()
}

/// `:/c<i>/top`
pub fn counter_top_key(i: u64) -> Vec<u8> {
    format!("{ADMIN_PREFIX}c{i}/top").into_bytes()
}

/// `:/q/<qdate>/<seqnum>/<paddedid>`
pub fn queue_key(qdate: &str, seqnum: u64, paddedid: &str) -> Vec<u8> {
    format!("{ADMIN_PREFIX}q/{qdate}/{seqnum:06}/{paddedid}").into_bytes()
}

/// Queue namespace prefix for range scans.
pub fn queue_prefix() -> Vec<u8> {
    format!("{ADMIN_PREFIX}q/").into_bytes()
}

/// `:/p/<index>`, zero-padded so cursor order survives byte ordering.
pub fn pool_key(index: u64) -> Vec<u8> {
    format!("{ADMIN_PREFIX}p/{index:020}").into_bytes()
}

/// `:/:/<key>`, user notes.
pub fn note_key(key: &str) -> Vec<u8> {
    format!("{ADMIN_PREFIX}:/{key}").into_bytes()
}

/// `<id>\t<elem>`, a user binding.
pub fn binding_key(id: &str, elem: &str) -> Vec<u8> {
    format!("{id}\t{elem}").into_bytes()
}

/// `<id>\t:/c`, the circulation record.
pub fn circ_key(id: &str) -> Vec<u8> {
    format!("{id}{ID_ADMIN_PREFIX}c").into_bytes()
}

/// `<id>\t:/h`, the hold flag.
pub fn hold_key(id: &str) -> Vec<u8> {
    format!("{id}{ID_ADMIN_PREFIX}h").into_bytes()
}

/// `:/idmap/<elem>\t<pattern>`, an idmap indirection entry.
pub fn idmap_key(elem: &str, pattern: &str) -> Vec<u8> {
    format!("{ADMIN_PREFIX}idmap/{elem}\t{pattern}").into_bytes()
}

pub fn idmap_prefix(elem: &str) -> Vec<u8> {
    format!("{ADMIN_PREFIX}idmap/{elem}\t").into_bytes()
}

/// Immutable creation parameters, prefetched once per session.
#[derive(Debug, Clone)]
pub struct AdminState {
    /// `None` for bind-only minters created with an empty template.
    pub template: Option<Template>,
    pub firstpart: String,
    pub total: i64,
    pub oatop: i64,
    pub padwidth: usize,
    pub percounter: u64,
    pub longterm: bool,
    pub wrap: bool,
    pub genonly: bool,
    pub addcheckchar: bool,
    pub checkrep: Repertoire,
    pub naan: String,
    pub naa: String,
    pub subnaa: String,
    pub properties: String,
    pub generator_random: String,
    /// Every cached pair as stored, for `dbinfo` and reopen comparison.
    pub raw: BTreeMap<String, String>,
}

impl AdminState {
    /// Prefetch the cached admin variables from an open store.
    pub fn load(store: &dyn KvStore) -> crate::Result<AdminState> {
        let mut raw = BTreeMap::new();
        for name in CACHED {
            if let Some(v) = store.get(&akey(name))? {
                raw.insert(name.to_string(), String::from_utf8_lossy(&v).into_owned());
            }
        }
        let get = |name: &str| raw.get(name).cloned().unwrap_or_default();
        let get_bool = |name: &str| raw.get(name).map(|v| v == "1").unwrap_or(false);
        let get_i64 = |name: &str| -> crate::Result<i64> {
            raw.get(name)
                .map(|v| {
                    v.parse().map_err(|_| {
                        CoreError::bad_input(
                            format!("admin variable {name}"),
                            format!("not a number: {v:?}"),
                        )
                    })
                })
                .transpose()
                .map(|v| v.unwrap_or(0))
                .map_err(Into::into)
        };

        let template_str = get(TEMPLATE);
        let template = if template_str.is_empty() {
            None
        } else {
            Some(Template::parse(&template_str)?)
        };
        let checkrep = match raw.get(CHECKREPERTOIRE) {
            Some(name) if !name.is_empty() => repertoire_by_name(name)?,
            _ => Repertoire::E,
        };

        Ok(AdminState {
            template,
            firstpart: get(FIRSTPART),
            total: get_i64(TOTAL)?,
            oatop: get_i64(OATOP)?,
            padwidth: get_i64(PADWIDTH)? as usize,
            percounter: get_i64(PERCOUNTER)? as u64,
            longterm: get_bool(LONGTERM),
            wrap: get_bool(WRAP),
            genonly: get_bool(GENONLY),
            addcheckchar: get_bool(ADDCHECKCHAR),
            checkrep,
            naan: get(NAAN),
            naa: get(NAA),
            subnaa: get(SUBNAA),
            properties: get(PROPERTIES),
            generator_random: get(GENERATOR_RANDOM),
            raw,
        })
    }

    /// Pad an identifier for queue-key embedding.
    pub fn pad_id(&self, id: &str) -> String {
        if id.len() >= self.padwidth {
            id.to_string()
        } else {
            format!("{}{}", "0".repeat(self.padwidth - id.len()), id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_builders() {
        assert_eq!(akey("template"), b":/template");
        assert_eq!(counter_value_key(12), b":/c12/value");
        assert_eq!(counter_top_key(0), b":/c0/top");
        assert_eq!(
            queue_key("20240101123000", 7, "0000013030/tst41"),
            b":/q/20240101123000/000007/0000013030/tst41"
        );
        assert_eq!(circ_key("13030/tst394"), b"13030/tst394\t:/c");
        assert_eq!(hold_key("x"), b"x\t:/h");
        assert_eq!(binding_key("x", "where"), b"x\twhere");
        assert_eq!(note_key("greeting"), b":/:/greeting");
        assert_eq!(idmap_key("locator", "^ab"), b":/idmap/locator\t^ab");
    }

    #[test]
    fn pool_keys_sort_by_index() {
        assert!(pool_key(9) < pool_key(10));
        assert!(pool_key(99) < pool_key(100));
    }

    #[test]
    fn queue_namespace_does_not_capture_queued_count() {
        let queued = akey(QUEUED);
        assert!(!queued.starts_with(&queue_prefix()));
    }

    #[test]
    fn pad_id_left_pads_with_zeros() {
        let admin = AdminState {
            template: None,
            firstpart: String::new(),
            total: 290,
            oatop: 290,
            padwidth: 5,
            percounter: 1,
            longterm: false,
            wrap: false,
            genonly: false,
            addcheckchar: false,
            checkrep: Repertoire::E,
            naan: String::new(),
            naa: String::new(),
            subnaa: String::new(),
            properties: String::new(),
            generator_random: String::new(),
            raw: BTreeMap::new(),
        };
        assert_eq!(admin.pad_id("ab1"), "00ab1");
        assert_eq!(admin.pad_id("abcdef"), "abcdef");
    }
}
