//! HTML rendering for the prediction form

use sonicdt_core::{FeatureVector, Prediction, SonicError, FEATURE_FIELDS};

const TITLE: &str = "Well Log DT Prediction App";

/// Result of a form submission to show under the form
pub enum Outcome<'a> {
    Success(&'a Prediction),
    Failure(&'a SonicError),
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.columns {{ display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; max-width: 48rem; }}
.success {{ background: #e6f4ea; padding: 0.75rem; }}
.error {{ background: #fdecea; padding: 0.75rem; }}
table {{ border-collapse: collapse; margin-top: 1rem; }}
td, th {{ border: 1px solid #ccc; padding: 0.25rem 0.75rem; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = TITLE,
        body = body
    )
}

/// Form page, optionally followed by a submission outcome
pub fn render_form(values: &FeatureVector, model: &str, outcome: Option<Outcome<'_>>) -> String {
    let mut body = format!(
        "<p>This application uses a pre-trained {} model to predict the DT (sonic log) value \
         based on well log measurements (RHOB, GR, NPHI, PEF). Enter the values below to get \
         the predicted DT value.</p>\n<h2>Predict DT</h2>\n",
        escape(model)
    );

    body.push_str("<form method=\"post\" action=\"/predict\">\n<div class=\"columns\">\n");
    for (field, value) in FEATURE_FIELDS.iter().zip(values.values()) {
        body.push_str(&format!(
            "<label>{label}<br><input type=\"number\" name=\"{key}\" value=\"{value}\" step=\"{step}\" required></label>\n",
            label = escape(field.label),
            key = field.key,
            value = value,
            step = field.step,
        ));
    }
    body.push_str("</div>\n<p><button type=\"submit\">Predict DT</button></p>\n</form>\n");

    match outcome {
        Some(Outcome::Success(prediction)) => {
            let f = &prediction.features;
            body.push_str(&format!(
                "<p class=\"success\">Predicted DT: {}</p>\n\
                 <table>\n<tr><th>RHOB</th><th>GR</th><th>NPHI</th><th>PEF</th><th>Predicted DT</th></tr>\n\
                 <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n</table>\n",
                escape(&prediction.display_value()),
                f.rhob,
                f.gr,
                f.nphi,
                f.pef,
                (prediction.dt * 100.0).round() / 100.0,
            ));
        }
        Some(Outcome::Failure(err)) => {
            body.push_str(&format!("<p class=\"error\">{}</p>\n", escape(&err.to_string())));
        }
        None => {}
    }

    layout(&body)
}

/// Page shown when the model is unavailable; no form is offered
pub fn render_halted(message: &str) -> String {
    layout(&format!(
        "<p class=\"error\">{}</p>\n<p>Predictions are unavailable until the model is loaded.</p>\n",
        escape(message)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_form_has_fields_with_defaults() {
        let html = render_form(&FeatureVector::default(), "random forest", None);
        assert!(html.contains("RHOB (Density, g/cm³)"));
        assert!(html.contains(r#"name="rhob" value="2.5" step="0.01""#));
        assert!(html.contains(r#"name="gr" value="50" step="0.1""#));
        assert!(html.contains(r#"name="nphi" value="0.2" step="0.01""#));
        assert!(html.contains(r#"name="pef" value="5" step="0.1""#));
        assert!(!html.contains("Predicted DT:"));
    }

    #[test]
    fn test_form_with_prediction() {
        let prediction = Prediction::new(FeatureVector::default(), 120.345);
        let html = render_form(
            &prediction.features,
            "stub",
            Some(Outcome::Success(&prediction)),
        );
        assert!(html.contains("Predicted DT: 120.35 µs/ft"));
        assert!(html.contains("<td>120.35</td>"));
    }

    #[test]
    fn test_form_with_error_is_escaped() {
        let err = SonicError::prediction("bad <input>");
        let html = render_form(&FeatureVector::default(), "stub", Some(Outcome::Failure(&err)));
        assert!(html.contains("Error making prediction: bad &lt;input&gt;"));
    }

    #[test]
    fn test_halted_page_has_no_form() {
        let html = render_halted("Model file 'model.bin' not found");
        assert!(html.contains("Model file &#39;model.bin&#39; not found"));
        assert!(!html.contains("<form"));
    }
}
