//! Exported roast sessions.
//!
//! A session saved under base path `X` produces:
//! - `X.csv`: samples and events interleaved, sorted by `t_sec`, tagged by `row_type`
//! - `X.samples.csv` and `X.events.csv`: the same rows split by kind
//! - `X.meta.json`: roast metadata plus calibration in force at export time
//!
//! Non-finite values serialize as empty cells and read back as NaN.
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SAMPLE_HEADERS: [&str; 7] = ["t_sec", "et_c", "bt_est_c", "ror", "gas", "air", "set_temp"];
pub const EVENT_HEADERS: [&str; 3] = ["event", "t_sec", "temp_c"];
pub const COMBINED_HEADERS: [&str; 10] = [
    "row_type", "t_sec", "et_c", "bt_est_c", "ror", "gas", "air", "set_temp", "event", "temp_c",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub t_sec: f64,
    #[serde(default = "nan", with = "nan_cell")]
    pub et_c: f64,
    #[serde(default = "nan", with = "nan_cell")]
    pub bt_est_c: f64,
    #[serde(default = "nan", with = "nan_cell")]
    pub ror: f64,
    #[serde(default)]
    pub gas: i32,
    #[serde(default)]
    pub air: i32,
    #[serde(default)]
    pub set_temp: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub event: String,
    pub t_sec: f64,
    #[serde(default = "nan", with = "nan_cell")]
    pub temp_c: f64,
}

/// One line of the combined export. Columns that do not apply to the row kind stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CombinedRow {
    row_type: String,
    #[serde(default)]
    t_sec: Option<f64>,
    #[serde(default)]
    et_c: Option<f64>,
    #[serde(default)]
    bt_est_c: Option<f64>,
    #[serde(default)]
    ror: Option<f64>,
    #[serde(default)]
    gas: Option<i32>,
    #[serde(default)]
    air: Option<i32>,
    #[serde(default)]
    set_temp: Option<i32>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    temp_c: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMeta {
    pub origin: String,
    pub density: String,
    pub moisture: String,
    pub charge_mass_g: String,
    pub process: String,
    #[serde(rename = "brewTarget")]
    pub brew_target: String,
    pub events_count: usize,
    pub offset_c: f64,
    pub scale_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    pub samples: Vec<SampleRow>,
    pub events: Vec<EventRow>,
}

/// Round to `dp` decimals; non-finite values pass through for the empty-cell encoding.
pub fn round_dp(x: f64, dp: i32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let k = 10f64.powi(dp);
    (x * k).round() / k
}

impl SampleRow {
    /// Apply export precision: 2 dp for time and temperatures, 3 dp for RoR.
    pub fn rounded(self) -> Self {
        Self {
            t_sec: round_dp(self.t_sec, 2),
            et_c: round_dp(self.et_c, 2),
            bt_est_c: round_dp(self.bt_est_c, 2),
            ror: round_dp(self.ror, 3),
            ..self
        }
    }
}

impl EventRow {
    /// Apply export precision: 2 dp for time, 1 dp for temperature.
    pub fn rounded(&self) -> Self {
        Self {
            event: self.event.clone(),
            t_sec: round_dp(self.t_sec, 2),
            temp_c: round_dp(self.temp_c, 1),
        }
    }
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

impl From<&SampleRow> for CombinedRow {
    fn from(s: &SampleRow) -> Self {
        Self {
            row_type: "sample".to_string(),
            t_sec: finite(s.t_sec),
            et_c: finite(s.et_c),
            bt_est_c: finite(s.bt_est_c),
            ror: finite(s.ror),
            gas: Some(s.gas),
            air: Some(s.air),
            set_temp: Some(s.set_temp),
            ..Self::default()
        }
    }
}

impl From<&EventRow> for CombinedRow {
    fn from(e: &EventRow) -> Self {
        Self {
            row_type: "event".to_string(),
            t_sec: finite(e.t_sec),
            event: Some(e.event.clone()),
            temp_c: finite(e.temp_c),
            ..Self::default()
        }
    }
}

fn nan() -> f64 {
    f64::NAN
}

/// Serde adapter mapping NaN <-> empty cell.
mod nan_cell {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_finite() {
            s.serialize_some(v)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

pub fn write_samples_csv<W: Write>(w: W, rows: &[SampleRow]) -> eyre::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(SAMPLE_HEADERS)?;
    for r in rows {
        wtr.serialize(r.rounded())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_events_csv<W: Write>(w: W, rows: &[EventRow]) -> eyre::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(EVENT_HEADERS)?;
    for r in rows {
        wtr.serialize(r.rounded())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_combined_csv<W: Write>(
    w: W,
    samples: &[SampleRow],
    events: &[EventRow],
) -> eyre::Result<()> {
    let mut rows: Vec<CombinedRow> = samples
        .iter()
        .map(|s| CombinedRow::from(&s.rounded()))
        .chain(events.iter().map(|e| CombinedRow::from(&e.rounded())))
        .collect();
    // Stable: at equal times samples stay ahead of events.
    rows.sort_by(|a, b| {
        a.t_sec
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.t_sec.unwrap_or(f64::INFINITY))
    });

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    wtr.write_record(COMBINED_HEADERS)?;
    for r in &rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Paths produced by [`write_session`].
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub combined: PathBuf,
    pub samples: PathBuf,
    pub events: PathBuf,
    pub meta: PathBuf,
}

impl SessionPaths {
    /// Derive the four export paths from a base path; a trailing `.csv` is stripped.
    pub fn for_base(base: &Path) -> Self {
        let stem = if base.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
            base.with_extension("")
        } else {
            base.to_path_buf()
        };
        let with = |suffix: &str| {
            let mut s = stem.clone().into_os_string();
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            combined: with(".csv"),
            samples: with(".samples.csv"),
            events: with(".events.csv"),
            meta: with(".meta.json"),
        }
    }
}

pub fn write_session(
    base: &Path,
    samples: &[SampleRow],
    events: &[EventRow],
    meta: &SessionMeta,
) -> eyre::Result<SessionPaths> {
    let paths = SessionPaths::for_base(base);
    let create = |p: &Path| {
        std::fs::File::create(p).map_err(|e| eyre::eyre!("create {:?}: {}", p, e))
    };

    write_combined_csv(create(&paths.combined)?, samples, events)?;
    write_samples_csv(create(&paths.samples)?, samples)?;
    write_events_csv(create(&paths.events)?, events)?;

    let meta = SessionMeta {
        events_count: events.len(),
        ..meta.clone()
    };
    let text = serde_json::to_string_pretty(&meta)?;
    crate::write_atomic(&paths.meta, text.as_bytes())
        .map_err(|e| eyre::eyre!("write {:?}: {}", paths.meta, e))?;
    Ok(paths)
}

fn headers_of<R: Read>(rdr: &mut csv::Reader<R>) -> eyre::Result<Vec<String>> {
    Ok(rdr.headers()?.iter().map(str::to_string).collect())
}

pub fn read_samples_csv<R: Read>(r: R) -> eyre::Result<Vec<SampleRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(r);
    let headers = headers_of(&mut rdr)?;
    if !headers.iter().any(|h| h == "t_sec") {
        eyre::bail!("samples CSV is missing the 't_sec' column");
    }
    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<SampleRow>().enumerate() {
        match rec {
            Ok(row) => out.push(row),
            Err(e) => eyre::bail!("invalid samples row {}: {}", idx + 2, e),
        }
    }
    Ok(out)
}

pub fn read_events_csv<R: Read>(r: R) -> eyre::Result<Vec<EventRow>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(r);
    let headers = headers_of(&mut rdr)?;
    if !EVENT_HEADERS.iter().all(|h| headers.iter().any(|x| x == h)) {
        eyre::bail!(
            "events CSV must have headers '{}', got: {}",
            EVENT_HEADERS.join(","),
            headers.join(",")
        );
    }
    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<EventRow>().enumerate() {
        match rec {
            Ok(row) => out.push(row),
            Err(e) => eyre::bail!("invalid events row {}: {}", idx + 2, e),
        }
    }
    Ok(out)
}

fn read_combined_csv<R: Read>(r: R) -> eyre::Result<SessionRecord> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(r);
    let mut rec = SessionRecord::default();
    for (idx, row) in rdr.deserialize::<CombinedRow>().enumerate() {
        let row = row.map_err(|e| eyre::eyre!("invalid session row {}: {}", idx + 2, e))?;
        let Some(t_sec) = row.t_sec else {
            eyre::bail!("session row {} has no t_sec", idx + 2);
        };
        match row.row_type.as_str() {
            "sample" => rec.samples.push(SampleRow {
                t_sec,
                et_c: row.et_c.unwrap_or(f64::NAN),
                bt_est_c: row.bt_est_c.unwrap_or(f64::NAN),
                ror: row.ror.unwrap_or(f64::NAN),
                gas: row.gas.unwrap_or(0),
                air: row.air.unwrap_or(0),
                set_temp: row.set_temp.unwrap_or(0),
            }),
            "event" => rec.events.push(EventRow {
                event: row.event.unwrap_or_default(),
                t_sec,
                temp_c: row.temp_c.unwrap_or(f64::NAN),
            }),
            other => eyre::bail!("session row {} has unknown row_type '{}'", idx + 2, other),
        }
    }
    Ok(rec)
}

/// Load a session from a combined file, a `.samples.csv` (with its sibling
/// `.events.csv` when present), or a bare samples file.
pub fn read_session(path: &Path) -> eyre::Result<SessionRecord> {
    let open = |p: &Path| std::fs::File::open(p).map_err(|e| eyre::eyre!("open {:?}: {}", p, e));

    let headers = {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(open(path)?);
        headers_of(&mut rdr)?
    };
    if headers.iter().any(|h| h == "row_type") {
        return read_combined_csv(open(path)?);
    }

    let samples = read_samples_csv(open(path)?)?;
    let name = path.to_string_lossy();
    let events = match name.strip_suffix(".samples.csv") {
        Some(stem) => {
            let sibling = PathBuf::from(format!("{stem}.events.csv"));
            if sibling.exists() {
                read_events_csv(open(&sibling)?)?
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };
    Ok(SessionRecord { samples, events })
}

pub fn load_meta_json(path: &Path) -> eyre::Result<SessionMeta> {
    let text =
        std::fs::read_to_string(path).map_err(|e| eyre::eyre!("read meta {:?}: {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| eyre::eyre!("parse meta {:?}: {}", path, e))
}
