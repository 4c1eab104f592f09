//! Database creation: validate inputs, write every admin record, report.

use std::fmt;
use std::fs;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use super::admin;
use super::session::{Minter, Session, utc_stamp};
use crate::config::{ConfigError, Settings};
use crate::core::rng;
use crate::core::{CoreError, GenMode, NOLIMIT, Repertoire, SUBCOUNTERS, Template};
use crate::core::limits::UNBOUNDED_PADWIDTH;
use crate::store::OpenMode;
use crate::Result;

/// Durability term of a new minter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Long,
    Medium,
    Short,
    /// `-`: unspecified.
    Unspecified,
}

impl Term {
    pub fn as_str(self) -> &'static str {
        match self {
            Term::Long => "long",
            Term::Medium => "medium",
            Term::Short => "short",
            Term::Unspecified => "-",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Term {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, CoreError> {
        match s {
            "long" => Ok(Term::Long),
            "medium" => Ok(Term::Medium),
            "short" => Ok(Term::Short),
            "-" => Ok(Term::Unspecified),
            other => Err(CoreError::bad_input(
                "term",
                format!("`{other}` is not one of long, medium, short, -"),
            )),
        }
    }
}

/// Inputs to [`Minter::create`] beyond the settings.
#[derive(Debug, Clone)]
pub struct CreateArgs {
    /// `None` or empty creates a bind-only minter.
    pub template: Option<String>,
    pub term: Term,
    pub naan: String,
    pub naa: String,
    pub subnaa: String,
}

impl Minter {
    /// Materialize a fresh minter database and return an open session plus
    /// the human-readable creation report.
    pub fn create(settings: &Settings, args: &CreateArgs) -> Result<(Arc<Minter>, String)> {
        let contact = settings.contact();
        if contact.trim().is_empty() {
            return Err(CoreError::bad_input("contact", "must not be empty").into());
        }
        if settings.generator != rng::GENERATOR_NAME {
            return Err(ConfigError::UnknownGenerator {
                name: settings.generator.clone(),
            }
            .into());
        }
        if args.term == Term::Long {
            if args.naan.len() != 5 || !args.naan.chars().all(|c| c.is_ascii_digit()) {
                return Err(CoreError::bad_input(
                    "naan",
                    "long-term minters need a 5-digit name assigning authority number",
                )
                .into());
            }
            if args.naa.trim().is_empty() || args.subnaa.trim().is_empty() {
                return Err(CoreError::bad_input(
                    "naa/subnaa",
                    "long-term minters need a full naming authority triple",
                )
                .into());
            }
        }

        let template = match args.template.as_deref() {
            None | Some("") => None,
            Some(t) => Some(Template::parse(t)?),
        };

        let minter = Minter::open_fresh(settings, OpenMode::Create)?;
        let report = {
            let mut session = minter.lock();
            write_admin_records(&mut session, &template, args)?;
            session.admin = admin::AdminState::load(session.store.as_ref())?;
            let report = creation_report(&session, &template, args);
            write_side_files(&session, &report)?;
            session.log_event("database created");
            report
        };

        let minter = Arc::new(minter);
        super::session::register(&minter);
        Ok((minter, report))
    }
}

fn write_admin_records(
    session: &mut Session,
    template: &Option<Template>,
    args: &CreateArgs,
) -> Result<()> {
    let longterm = args.term == Term::Long;
    let wrap = args.term == Term::Short;
    let (prefix, mask_str, mode) = match template {
        Some(t) => (
            t.prefix.clone(),
            t.mask.to_string(),
            Some(t.mask.mode),
        ),
        None => (String::new(), String::new(), None),
    };
    let total: i64 = match template {
        Some(t) => t
            .capacity()
            .map(|c| i64::try_from(c).unwrap_or(i64::MAX))
            .unwrap_or(NOLIMIT),
        None => 0,
    };
    let firstpart = if args.naan.is_empty() {
        prefix.clone()
    } else {
        format!("{}/{}", args.naan, prefix)
    };
    let padwidth = if total == NOLIMIT {
        UNBOUNDED_PADWIDTH
    } else {
        2 + total.to_string().len()
    };
    let percounter: u64 = if total <= 0 {
        0
    } else {
        (total as u64).div_ceil(SUBCOUNTERS)
    };
    let check = template.as_ref().map(|t| t.mask.check).unwrap_or(false);
    let checkrep = template
        .as_ref()
        .map(|t| t.mask.check_repertoire())
        .unwrap_or(Repertoire::E);

    let set = |s: &mut Session, name: &str, value: &str| s.set_str(&admin::akey(name), value);
    let flag = |b: bool| if b { "1" } else { "0" };

    set(
        session,
        admin::TEMPLATE,
        &template.as_ref().map(|t| t.to_string()).unwrap_or_default(),
    )?;
    set(session, admin::PREFIX, &prefix)?;
    set(session, admin::MASK, &mask_str)?;
    set(session, admin::FIRSTPART, &firstpart)?;
    set(
        session,
        admin::GENERATOR_TYPE,
        mode.map(GenMode::as_str).unwrap_or(""),
    )?;
    if mode == Some(GenMode::Random) {
        set(session, admin::GENERATOR_RANDOM, rng::GENERATOR_NAME)?;
    }
    set(session, admin::TOTAL, &total.to_string())?;
    set(session, admin::OATOP, &total.to_string())?;
    set(session, admin::OACOUNTER, "0")?;
    set(session, admin::PADWIDTH, &padwidth.to_string())?;
    set(session, admin::PERCOUNTER, &percounter.to_string())?;
    set(session, admin::LONGTERM, flag(longterm))?;
    set(session, admin::WRAP, flag(wrap))?;
    set(session, admin::ADDCHECKCHAR, flag(check))?;
    set(session, admin::CHECKREPERTOIRE, &checkrep.mask_char().to_string())?;
    set(session, admin::CHECKALPHABET, checkrep.chars())?;
    set(session, admin::NAAN, &args.naan)?;
    set(session, admin::NAA, &args.naa)?;
    set(session, admin::SUBNAA, &args.subnaa)?;
    set(session, admin::GENONLY, flag(template.is_some()))?;
    set(session, admin::CREATED, &utc_stamp())?;
    set(session, admin::HELD, "0")?;
    set(session, admin::QUEUED, "0")?;
    set(session, admin::PREGENERATED, "0")?;
    set(session, admin::FSEQNUM, "1")?;
    set(session, admin::GSEQNUM, "1")?;
    set(session, admin::GSEQNUM_DATE, "00000000000000")?;
    set(session, admin::PREGEN_HEAD, "1")?;
    set(session, admin::PREGEN_TAIL, "1")?;

    if mode == Some(GenMode::Random) && total > 0 {
        init_subcounters(session, total as u64, percounter)?;
    }

    let properties = granite_properties(template, args);
    set(session, admin::PROPERTIES, &properties)?;
    Ok(())
}

/// Split `total` into `⌈total/percounter⌉` buckets whose tops sum to
/// `total`; the last bucket may be smaller.
pub(crate) fn init_subcounters(session: &mut Session, total: u64, percounter: u64) -> Result<()> {
    let buckets = total.div_ceil(percounter);
    let mut saclist = String::new();
    for i in 0..buckets {
        let top = if i == buckets - 1 {
            total - (buckets - 1) * percounter
        } else {
            percounter
        };
        session.set_str(&admin::counter_value_key(i), "0")?;
        session.set_str(&admin::counter_top_key(i), &top.to_string())?;
        saclist.push_str(&format!("c{i} "));
    }
    session.set_str(&admin::akey(admin::SACLIST), &saclist)?;
    session.set_str(&admin::akey(admin::SICLIST), "")?;
    Ok(())
}

const VOWELS: &str = "aeiouyAEIOUY";

/// Repertoires whose character lists contain no vowels.
fn vowel_free(rep: Repertoire) -> bool {
    matches!(
        rep,
        Repertoire::D | Repertoire::E | Repertoire::I | Repertoire::UpperE
    )
}

/// Derive the seven-letter durability mnemonic. Letters that do not apply
/// render as `-` in position.
fn granite_properties(template: &Option<Template>, args: &CreateArgs) -> String {
    let prefix = template.as_ref().map(|t| t.prefix.as_str()).unwrap_or("");
    let mask_str = template
        .as_ref()
        .map(|t| t.mask.to_string())
        .unwrap_or_default();
    let spelled = format!("{prefix}{mask_str}");
    let no_vowel_run = !spelled
        .chars()
        .collect::<Vec<_>>()
        .windows(3)
        .any(|w| w.iter().all(|c| VOWELS.contains(*c)));
    let random = template
        .as_ref()
        .map(|t| t.mask.mode == GenMode::Random)
        .unwrap_or(false);
    let check = template.as_ref().map(|t| t.mask.check).unwrap_or(false);
    let elision_free = !prefix.chars().any(|c| VOWELS.contains(c))
        && template
            .as_ref()
            .map(|t| t.mask.chars.iter().all(|r| vowel_free(*r)))
            .unwrap_or(false);

    let mut props = String::with_capacity(7);
    props.push(if !args.naan.is_empty() && args.naan != "00000" {
        'G'
    } else {
        '-'
    });
    props.push(if random { 'R' } else { '-' });
    props.push(if no_vowel_run { 'A' } else { '-' });
    props.push(if args.term == Term::Long { 'N' } else { '-' });
    props.push(if !prefix.contains('-') { 'I' } else { '-' });
    props.push(if check { 'T' } else { '-' });
    props.push(if elision_free { 'E' } else { '-' });
    props
}

fn creation_report(
    session: &Session,
    template: &Option<Template>,
    args: &CreateArgs,
) -> String {
    let admin = &session.admin;
    let size = match admin.total {
        NOLIMIT => "unlimited".to_string(),
        n => n.to_string(),
    };
    let generator = match template.as_ref().map(|t| t.mask.mode) {
        Some(GenMode::Random) => format!("random ({})", rng::GENERATOR_NAME),
        Some(_) => "sequential".to_string(),
        None => "none (bind-only)".to_string(),
    };
    let what = if admin.firstpart.is_empty() {
        "a bind-only minter".to_string()
    } else {
        format!("minter for identifiers beginning {}", admin.firstpart)
    };
    let mut report = String::new();
    report.push_str(&format!("Created {what}\n"));
    report.push_str(&format!(
        "Database:    {} ({} backend)\n",
        session.dir.display(),
        session.backend
    ));
    report.push_str(&format!(
        "Template:    {}\n",
        template
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    ));
    report.push_str(&format!("Generator:   {generator}\n"));
    report.push_str(&format!("Size:        {size}\n"));
    report.push_str(&format!(
        "Check char:  {}\n",
        if admin.addcheckchar {
            format!("yes (repertoire {})", admin.checkrep.mask_char())
        } else {
            "no".to_string()
        }
    ));
    report.push_str(&format!("Term:        {}\n", args.term));
    report.push_str(&format!(
        "Authority:   naan={} naa={} subnaa={}\n",
        args.naan, args.naa, args.subnaa
    ));
    report.push_str(&format!("Properties:  {}\n", admin.properties));
    report
}

/// README with the creation report, plus the empty per-backend log.
fn write_side_files(session: &Session, report: &str) -> Result<()> {
    let readme = session.dir.join("README");
    let io_err = |path: &std::path::Path, e: std::io::Error| ConfigError::DataDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut f = fs::File::create(&readme).map_err(|e| io_err(&readme, e))?;
    f.write_all(report.as_bytes())
        .map_err(|e| io_err(&readme, e))?;

    let backend_log = session.dir.join(format!("log{}", session.backend));
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&backend_log)
        .map_err(|e| io_err(&backend_log, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(template: &str, term: Term, naan: &str) -> CreateArgs {
        CreateArgs {
            template: Some(template.to_string()),
            term,
            naan: naan.to_string(),
            naa: "example.org".to_string(),
            subnaa: "registry".to_string(),
        }
    }

    #[test]
    fn granite_all_letters() {
        let t = Some(Template::parse("tst3.rdek").unwrap());
        let props = granite_properties(&t, &args("tst3.rdek", Term::Long, "13030"));
        assert_eq!(props, "GRANITE");
    }

    #[test]
    fn granite_sequential_short() {
        let t = Some(Template::parse(".sdd").unwrap());
        let props = granite_properties(&t, &args(".sdd", Term::Short, ""));
        assert_eq!(props, "--A-I-E");
    }

    #[test]
    fn granite_vowelled_prefix_drops_e() {
        let t = Some(Template::parse("ab.rde").unwrap());
        let props = granite_properties(&t, &args("ab.rde", Term::Long, "13030"));
        assert_eq!(&props[6..], "-");
    }

    #[test]
    fn term_parse() {
        assert_eq!("long".parse::<Term>().unwrap(), Term::Long);
        assert_eq!("-".parse::<Term>().unwrap(), Term::Unspecified);
        assert!("forever".parse::<Term>().is_err());
    }
}
