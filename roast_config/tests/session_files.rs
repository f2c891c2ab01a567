use roast_config::session::{
    EventRow, SampleRow, SessionMeta, SessionPaths, load_meta_json, read_session, write_session,
};
use tempfile::tempdir;

fn sample(t: f64, et: f64, bt: f64, ror: f64) -> SampleRow {
    SampleRow {
        t_sec: t,
        et_c: et,
        bt_est_c: bt,
        ror,
        gas: 6,
        air: 4,
        set_temp: 210,
    }
}

fn fixture() -> (Vec<SampleRow>, Vec<EventRow>) {
    let samples = vec![
        sample(0.0, 180.123, f64::NAN, f64::NAN),
        sample(0.5, 181.0, 180.5, f64::NAN),
        sample(1.0, 182.0, 181.0, 12.34567),
    ];
    let events = vec![
        EventRow {
            event: "CHARGE".into(),
            t_sec: 0.5,
            temp_c: 180.55,
        },
        EventRow {
            event: "TP".into(),
            t_sec: 1.0,
            temp_c: f64::NAN,
        },
    ];
    (samples, events)
}

#[test]
fn combined_export_reads_back() {
    let dir = tempdir().unwrap();
    let (samples, events) = fixture();
    let paths = write_session(&dir.path().join("roast"), &samples, &events, &SessionMeta::default())
        .unwrap();

    let rec = read_session(&paths.combined).unwrap();
    assert_eq!(rec.samples.len(), 3);
    assert_eq!(rec.events.len(), 2);
    assert_eq!(rec.samples[0].et_c, 180.12);
    assert!(rec.samples[0].bt_est_c.is_nan());
    assert!(rec.samples[1].ror.is_nan());
    assert_eq!(rec.samples[2].ror, 12.346);
    assert_eq!(rec.samples[2].gas, 6);
    assert_eq!(rec.events[0].event, "CHARGE");
    assert_eq!(rec.events[0].temp_c, 180.6);
    assert!(rec.events[1].temp_c.is_nan());
}

#[test]
fn combined_rows_are_sorted_by_time() {
    let dir = tempdir().unwrap();
    let (samples, events) = fixture();
    let paths = write_session(&dir.path().join("roast"), &samples, &events, &SessionMeta::default())
        .unwrap();
    let text = std::fs::read_to_string(&paths.combined).unwrap();
    let kinds: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(kinds, ["sample", "sample", "event", "sample", "event"]);
}

#[test]
fn split_samples_file_picks_up_sibling_events() {
    let dir = tempdir().unwrap();
    let (samples, events) = fixture();
    let paths = write_session(&dir.path().join("roast"), &samples, &events, &SessionMeta::default())
        .unwrap();

    let rec = read_session(&paths.samples).unwrap();
    assert_eq!(rec.samples.len(), 3);
    assert_eq!(rec.events.len(), 2);
    assert_eq!(rec.events[1].event, "TP");
}

#[test]
fn bare_samples_file_has_no_events() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.csv");
    std::fs::write(&path, "t_sec,et_c,bt_est_c\n0.0,20.0,\n0.5,21.0,20.5\n").unwrap();

    let rec = read_session(&path).unwrap();
    assert!(rec.events.is_empty());
    assert_eq!(rec.samples.len(), 2);
    assert!(rec.samples[0].bt_est_c.is_nan());
    assert!(rec.samples[0].ror.is_nan());
    assert_eq!(rec.samples[1].gas, 0);
}

#[test]
fn missing_time_column_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "et_c,bt_est_c\n20.0,20.0\n").unwrap();
    let err = read_session(&path).unwrap_err();
    assert!(format!("{err}").contains("t_sec"));
}

#[test]
fn meta_records_event_count_and_calibration() {
    let dir = tempdir().unwrap();
    let (samples, events) = fixture();
    let meta = SessionMeta {
        origin: "Ethiopia".into(),
        process: "washed".into(),
        brew_target: "filter".into(),
        offset_c: -0.5,
        scale_pct: 100.5,
        ..SessionMeta::default()
    };
    let paths = write_session(&dir.path().join("roast.csv"), &samples, &events, &meta).unwrap();
    assert_eq!(paths.combined, SessionPaths::for_base(&dir.path().join("roast")).combined);

    let back = load_meta_json(&paths.meta).unwrap();
    assert_eq!(back.events_count, 2);
    assert_eq!(back.origin, "Ethiopia");
    assert_eq!(back.brew_target, "filter");
    assert_eq!(back.scale_pct, 100.5);

    let raw = std::fs::read_to_string(&paths.meta).unwrap();
    assert!(raw.contains("\"brewTarget\""));
}

#[test]
fn empty_session_still_writes_headers() {
    let dir = tempdir().unwrap();
    let paths = write_session(&dir.path().join("empty"), &[], &[], &SessionMeta::default()).unwrap();
    let events = std::fs::read_to_string(&paths.events).unwrap();
    assert_eq!(events, "event,t_sec,temp_c\n");
    let rec = read_session(&paths.combined).unwrap();
    assert!(rec.samples.is_empty() && rec.events.is_empty());
}
