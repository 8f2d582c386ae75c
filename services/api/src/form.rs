use axum::response::Html;
use credit_risk::scoring::EducationLevel;
use std::fmt::Write;

struct NumericField {
    name: &'static str,
    label: &'static str,
    default: &'static str,
    min: &'static str,
    step: &'static str,
    integer: bool,
}

const NUMERIC_FIELDS: [NumericField; 7] = [
    NumericField {
        name: "Age",
        label: "Age",
        default: "56",
        min: "18",
        step: "1",
        integer: true,
    },
    NumericField {
        name: "YearsEmployed",
        label: "Years employed",
        default: "16",
        min: "0",
        step: "1",
        integer: true,
    },
    NumericField {
        name: "Income",
        label: "Income (thousands)",
        default: "232.0",
        min: "0",
        step: "0.01",
        integer: false,
    },
    NumericField {
        name: "CommercialDebt",
        label: "Commercial debt (thousands)",
        default: "2.8",
        min: "0",
        step: "0.01",
        integer: false,
    },
    NumericField {
        name: "CreditCardDebt",
        label: "Credit card debt (thousands)",
        default: "2.1",
        min: "0",
        step: "0.01",
        integer: false,
    },
    NumericField {
        name: "OtherDebt",
        label: "Other debt (thousands)",
        default: "4.39",
        min: "0",
        step: "0.01",
        integer: false,
    },
    NumericField {
        name: "IncomeToDebtRatio",
        label: "Income to debt ratio",
        default: "0.04",
        min: "",
        step: "0.0001",
        integer: false,
    },
];

const DEFAULT_EDUCATION: EducationLevel = EducationLevel::Postgraduate;

pub(crate) async fn form_page() -> Html<String> {
    Html(render_form())
}

pub(crate) fn render_form() -> String {
    let mut inputs = String::new();
    for field in &NUMERIC_FIELDS {
        let _ = write!(
            inputs,
            r#"
      <label for="{name}">{label}</label>
      <input type="number" id="{name}" name="{name}" value="{default}" min="{min}" step="{step}" data-kind="{kind}" required>"#,
            name = field.name,
            label = field.label,
            default = field.default,
            min = field.min,
            step = field.step,
            kind = if field.integer { "int" } else { "float" },
        );
    }

    let mut options = String::new();
    for level in EducationLevel::ALL {
        let selected = if level == DEFAULT_EDUCATION {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{value}"{selected}>{value} ({code})</option>"#,
            value = level.as_str(),
            code = level.short_code(),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Credit Default Risk</title>
  <style>
    body {{ font-family: sans-serif; background: #f4f7f9; display: flex; justify-content: center; padding: 2rem; }}
    form, #result, #error {{ background: #fff; padding: 1.5rem; border-radius: 12px; max-width: 28rem; }}
    label {{ display: block; margin-top: 0.75rem; font-size: 0.9rem; }}
    input, select {{ width: 100%; padding: 0.4rem; }}
    .hidden {{ display: none; }}
    .high {{ border-left: 4px solid #c0392b; }}
    .low {{ border-left: 4px solid #27ae60; }}
  </style>
</head>
<body>
  <main>
    <h1>Credit Default Risk</h1>
    <form id="prediction-form">{inputs}
      <label for="EducationLevel">Education level</label>
      <select id="EducationLevel" name="EducationLevel">{options}</select>
      <button type="submit" id="submit">Score applicant</button>
    </form>
    <section id="result" class="hidden">
      <h2 id="result-status"></h2>
      <p id="result-probability"></p>
    </section>
    <section id="error" class="hidden"><p id="error-text"></p></section>
  </main>
  <script>
    const form = document.getElementById('prediction-form');
    const result = document.getElementById('result');
    const errorBox = document.getElementById('error');

    form.addEventListener('submit', async (event) => {{
      event.preventDefault();
      result.classList.add('hidden');
      errorBox.classList.add('hidden');

      const payload = {{}};
      for (const element of form.elements) {{
        if (!element.name) continue;
        const kind = element.dataset.kind;
        if (kind === 'int') payload[element.name] = parseInt(element.value, 10);
        else if (kind === 'float') payload[element.name] = parseFloat(element.value);
        else payload[element.name] = element.value;
      }}

      try {{
        const response = await fetch('/predict', {{
          method: 'POST',
          headers: {{ 'Content-Type': 'application/json' }},
          body: JSON.stringify(payload),
        }});
        const data = await response.json();
        if (!response.ok) {{
          document.getElementById('error-text').textContent = data.error || 'Unexpected server error.';
          errorBox.classList.remove('hidden');
          return;
        }}
        document.getElementById('result-status').textContent = data.prediction_status;
        document.getElementById('result-probability').textContent =
          'Probability of default: ' + (data.probability_default * 100).toFixed(2) + '%';
        result.className = data.prediction_class === 1 ? 'high' : 'low';
      }} catch (err) {{
        document.getElementById('error-text').textContent = 'Could not reach the scoring service: ' + err.message;
        errorBox.classList.remove('hidden');
      }}
    }});
  </script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_posts_every_scoring_field() {
        let page = render_form();
        assert!(page.contains("fetch('/predict'"));
        for field in credit_risk::scoring::FEATURE_NAMES {
            assert!(
                page.contains(&format!(r#"name="{field}""#)),
                "missing input for {field}"
            );
        }
        assert!(page.contains(r#"<option value="Postgraduate" selected>"#));
    }
}
