use std::fmt::{self, Display, Formatter};
use strum::IntoEnumIterator;

use crate::api::form::DeviceForm;
use crate::domain::{CalculationResult, DeviceField, FieldErrors, LoadSummary};

/// The single HTML page of the calculator: device form, errors, and results.
#[derive(Debug, Default)]
pub struct Page<'a> {
    /// Values to prefill the form with
    pub form: Option<&'a DeviceForm>,
    pub errors: Option<&'a FieldErrors>,
    pub notice: Option<String>,
    /// Devices stored in the caller's session
    pub stored: Option<usize>,
    pub result: Option<&'a CalculationResult>,
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin:1em 0}\
td,th{border:1px solid #999;padding:.25em .5em;text-align:right}\
th:first-child,td:first-child{text-align:left}\
label{display:block;margin:.25em 0}\
.errors,.notice{color:#b00}";

impl Display for Page<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang=\"en\">")?;
        writeln!(f, "<head><meta charset=\"utf-8\"><title>Electrical load calculator</title>")?;
        writeln!(f, "<style>{}</style></head>", STYLE)?;
        writeln!(f, "<body>")?;
        writeln!(f, "<h1>Electrical load calculator</h1>")?;

        if let Some(notice) = &self.notice {
            writeln!(f, "<p class=\"notice\">{}</p>", Escaped(notice))?;
        }
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            writeln!(f, "<ul class=\"errors\">")?;
            for error in errors.iter() {
                writeln!(
                    f,
                    "<li>{}: {}</li>",
                    error.field.label(),
                    Escaped(&error.kind.to_string())
                )?;
            }
            writeln!(f, "</ul>")?;
        }

        self.fmt_form(f)?;

        if let Some(stored) = self.stored {
            writeln!(f, "<p class=\"stored\">Devices in this session: {}</p>", stored)?;
        }
        if let Some(result) = self.result {
            fmt_result(f, result)?;
        }

        writeln!(f, "</body>")?;
        write!(f, "</html>")
    }
}

impl Page<'_> {
    fn fmt_form(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "<form method=\"post\" action=\"/\">")?;
        for field in DeviceField::iter() {
            let value = self.form.and_then(|form| form.value(field)).unwrap_or("");
            let kind = match field {
                DeviceField::Name => "type=\"text\"",
                _ => "type=\"number\" step=\"any\"",
            };
            writeln!(
                f,
                "<label>{label} <input {kind} name=\"{name}\" value=\"{value}\" required></label>",
                label = field.label(),
                kind = kind,
                name = field,
                value = Escaped(value),
            )?;
        }
        writeln!(f, "<button type=\"submit\">Add device</button>")?;
        writeln!(
            f,
            "<button type=\"submit\" name=\"calculate\" value=\"1\">Add device and calculate</button>"
        )?;
        writeln!(f, "</form>")
    }
}

fn fmt_result(f: &mut Formatter<'_>, result: &CalculationResult) -> fmt::Result {
    writeln!(f, "<section id=\"result\">")?;
    writeln!(f, "<h2>Devices</h2>")?;
    writeln!(f, "<table class=\"devices\">")?;
    writeln!(
        f,
        "<tr><th>Name</th><th>η</th><th>cos φ</th><th>U</th><th>n</th><th>Pn</th>\
         <th>n·Pn</th><th>Kv</th><th>tg φ</th><th>Ip</th></tr>"
    )?;
    for d in &result.devices {
        writeln!(
            f,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
            Escaped(&d.name),
            d.efficiency,
            d.power_factor,
            d.voltage,
            d.devices_count,
            d.power,
            d.multiplication,
            d.utilization_factor,
            d.reactive_power_factor,
            d.calculated_current,
        )?;
    }
    writeln!(f, "</table>")?;

    writeln!(f, "<h2>Load</h2>")?;
    writeln!(f, "<table class=\"summary\">")?;
    writeln!(f, "<tr><th></th><th>Group</th><th>Workshop buses</th></tr>")?;
    for ((label, group), (_, workshop)) in summary_rows(&result.group)
        .into_iter()
        .zip(summary_rows(&result.workshop))
    {
        writeln!(
            f,
            "<tr><td>{}</td><td>{:.4}</td><td>{:.4}</td></tr>",
            label, group, workshop,
        )?;
    }
    writeln!(f, "</table>")?;
    writeln!(f, "</section>")
}

fn summary_rows(s: &LoadSummary) -> [(&'static str, f64); 7] {
    [
        ("Utilization rate", s.utilization_rate),
        ("Effective device count", s.effective_device_count),
        ("Active power coefficient", s.active_power_coefficient),
        ("Active load", s.active_load),
        ("Reactive load", s.reactive_load),
        ("Full power", s.full_power),
        ("Estimated current", s.estimated_current),
    ]
}

/// HTML-escapes text on display.
struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '&' => f.write_str("&amp;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => write!(f, "{}", c)?,
            }
        }
        Ok(())
    }
}
