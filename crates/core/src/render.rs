//! Confirmation page rendering.
//!
//! The page is rendered with `tera` from `success.html.tera` in the configured template
//! directory. Besides the record, the template gets a few helpers that turn stored values
//! into the German display labels used on the paper form.

use crate::constants::{SUB_PROJECT, SUCCESS_TEMPLATE_NAME};
use crate::envelope::TimeStamp;
use crate::record::Record;
use crate::{IntakeError, IntakeResult};
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera, Value};

/// Produces the HTML confirmation page of an accepted submission.
pub trait PageRenderer: Send + Sync {
    fn render(&self, reference_id: &str, time_stamp: TimeStamp, record: &Record)
        -> IntakeResult<String>;
}

/// Page reference shown to the user: `<time_stamp>-<reference_id>`.
pub fn page_reference(time_stamp: TimeStamp, reference_id: &str) -> String {
    format!("{time_stamp}-{reference_id}")
}

/// [`PageRenderer`] backed by a `tera` template loaded once at startup.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Load `success.html.tera` from `template_dir`.
    pub fn new(template_dir: &Path) -> IntakeResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html", ".html.tera"]);
        tera.add_template_file(
            template_dir.join(SUCCESS_TEMPLATE_NAME),
            Some(SUCCESS_TEMPLATE_NAME),
        )
        .map_err(IntakeError::TemplateLoad)?;
        Self::register_helpers(&mut tera);
        Ok(Self { tera })
    }

    /// Build a renderer from template source, e.g. for tests or embedded templates.
    pub fn from_source(source: &str) -> IntakeResult<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html", ".html.tera"]);
        tera.add_raw_template(SUCCESS_TEMPLATE_NAME, source)
            .map_err(IntakeError::TemplateLoad)?;
        Self::register_helpers(&mut tera);
        Ok(Self { tera })
    }

    fn register_helpers(tera: &mut Tera) {
        tera.register_filter("checkbox_message", checkbox_message);
        tera.register_filter("sex_message", sex_message);
        tera.register_filter("subject_group_message", subject_group_message);
        tera.register_filter("hand_message", hand_message);
        tera.register_filter("disease_message", disease_message);
        tera.register_function("date_message", date_message);
    }
}

impl PageRenderer for TeraRenderer {
    fn render(
        &self,
        reference_id: &str,
        time_stamp: TimeStamp,
        record: &Record,
    ) -> IntakeResult<String> {
        let mut context = Context::new();
        context.insert("sub_project", SUB_PROJECT);
        context.insert("reference", &page_reference(time_stamp, reference_id));
        context.insert("record", record);

        self.tera
            .render(SUCCESS_TEMPLATE_NAME, &context)
            .map_err(IntakeError::TemplateRender)
    }
}

fn checkbox_message(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let label = match value {
        Value::Bool(true) => "ja",
        Value::Bool(false) => "nein",
        Value::Null => "--",
        other => return Err(tera::Error::msg(format!("not a checkbox value: {other}"))),
    };
    Ok(Value::from(label))
}

/// Look up a string value in a fixed label table.
fn label(table: &[(&str, &str)], kind: &str, value: &Value) -> tera::Result<Value> {
    value
        .as_str()
        .and_then(|key| table.iter().find(|(k, _)| *k == key))
        .map(|(_, label)| Value::from(*label))
        .ok_or_else(|| tera::Error::msg(format!("unknown {kind}: {value}")))
}

fn sex_message(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    label(
        &[
            ("male", "männlich"),
            ("female", "weiblich"),
            ("diverse", "sonstiges"),
        ],
        "sex",
        value,
    )
}

fn subject_group_message(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    label(
        &[("healthy", "Gesund"), ("patient", "Patient")],
        "subject group",
        value,
    )
}

fn hand_message(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    label(
        &[("left", "links"), ("right", "rechts"), ("none", "keine")],
        "hand",
        value,
    )
}

fn disease_message(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    label(
        &[
            ("stroke", "Schlaganfall"),
            ("parkinson", "Parkinson"),
            ("tic", "Tic"),
            ("depression", "Depression"),
            ("alzheimer", "Alzheimer"),
        ],
        "disease",
        value,
    )
}

/// `date_message(year=…, month=…, day=…)`: the non-null parts joined with `-`.
fn date_message(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let parts: Vec<String> = ["year", "month", "day"]
        .iter()
        .filter_map(|key| match args.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    Ok(Value::from(parts.join("-")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldMap;
    use crate::normalize::normalize;
    use crate::record::build_record;
    use crate::schema::FORM_V2_3;
    use std::path::PathBuf;

    fn record(pairs: &[(&str, &str)]) -> Record {
        let mut fields: FieldMap = pairs.iter().copied().collect();
        normalize(&mut fields, &FORM_V2_3);
        build_record(&fields, &FORM_V2_3).unwrap()
    }

    fn render(source: &str, record: &Record) -> IntakeResult<String> {
        TeraRenderer::from_source(source)?.render("abc123", TimeStamp::from_secs(0.0), record)
    }

    #[test]
    fn reference_combines_time_stamp_and_id() {
        let page = render("{{ sub_project }} {{ reference }}", &Record::default()).unwrap();
        assert_eq!(page, "Z03 0.0-abc123");
    }

    #[test]
    fn record_fields_and_filters() {
        let record = record(&[
            ("sex", "female"),
            ("subject-group", "patient"),
            ("patient-stronger-impacted-hand", "left"),
            ("patient-main-disease", "stroke"),
            ("repeated-test", "on"),
        ]);
        let page = render(
            r#"{{ record["sex"] | sex_message }}|{{ record["subject-group"] | subject_group_message }}|{{ record["patient-stronger-impacted-hand"] | hand_message }}|{{ record["patient-main-disease"] | disease_message }}|{{ record["repeated-test"] | checkbox_message }}|{{ record["additional-mrt-dti"] | checkbox_message }}"#,
            &record,
        )
        .unwrap();
        assert_eq!(page, "weiblich|Patient|links|Schlaganfall|ja|--");
    }

    #[test]
    fn date_message_skips_missing_parts() {
        let record = record(&[
            ("patient-year-diagnosis", "2019"),
            ("patient-month-diagnosis", "3"),
        ]);
        let page = render(
            r#"{{ date_message(year=record["patient-year-diagnosis"], month=record["patient-month-diagnosis"], day=record["patient-day-diagnosis"]) }}"#,
            &record,
        )
        .unwrap();
        assert_eq!(page, "2019-3");
    }

    #[test]
    fn values_are_escaped() {
        let record = record(&[("additional-remarks", "<b>bold</b>")]);
        let page = render(r#"{{ record["additional-remarks"] }}"#, &record).unwrap();
        assert_eq!(page, "&lt;b&gt;bold&lt;&#x2F;b&gt;");
    }

    #[test]
    fn unknown_label_fails_rendering() {
        let record = record(&[("sex", "unknown")]);
        let err = render(r#"{{ record["sex"] | sex_message }}"#, &record).unwrap_err();
        assert!(matches!(err, IntakeError::TemplateRender(_)));
    }

    #[test]
    fn bundled_template_renders_a_minimal_record() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates");
        let renderer = TeraRenderer::new(&dir).unwrap();
        let record = record(&[
            ("form-data-version", "2.3"),
            ("subject-pseudonym", "test-111"),
            ("sex", "male"),
            ("subject-group", "healthy"),
            ("date-of-birth", "2000-01-01"),
            ("date-of-test", "2010-01-02"),
        ]);

        let page = renderer
            .render("deadbeef", TimeStamp::from_secs(0.0), &record)
            .unwrap();
        assert!(page.contains("0.0-deadbeef"));
        assert!(page.contains("test-111"));
        assert!(page.contains("männlich"));
    }

    #[test]
    fn missing_template_directory_fails_to_load() {
        let err = TeraRenderer::new(Path::new("/nonexistent/templates")).unwrap_err();
        assert!(matches!(err, IntakeError::TemplateLoad(_)));
    }
}
