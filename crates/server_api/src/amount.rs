use shared::error::ApiError;
use tracing::debug;

pub const MISSING_VALUE: &str = "Por favor, preencha o valor.";
pub const INVALID_VALUE: &str = "Por favor, insira um valor numérico válido (ex: 1.000,00)";

const CURRENCY_SYMBOL: &str = "R$";

/// Largest cent count an `f64` holds exactly (2^53); [`CurrencyLocale::format`] relies on it.
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

/// Number formatting convention used when writing the value cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyLocale {
    #[default]
    PtBr,
    EnUs,
}

impl CurrencyLocale {
    /// Resolves a locale tag such as `pt_BR.UTF-8`. Unknown tags fall back to the default.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split('.')
            .next()
            .unwrap_or_default()
            .replace('-', "_")
            .to_ascii_lowercase();
        match language.as_str() {
            "pt_br" | "pt" => Self::PtBr,
            "en_us" | "en" => Self::EnUs,
            _ => {
                debug!(tag, "unsupported locale, using default");
                Self::default()
            }
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::PtBr => "pt_BR",
            Self::EnUs => "en_US",
        }
    }

    fn separators(self) -> (char, char) {
        match self {
            Self::PtBr => ('.', ','),
            Self::EnUs => (',', '.'),
        }
    }

    /// `1234.5` → `R$ 1.234,50` in `pt_BR`.
    pub fn format(self, amount: f64) -> String {
        let (thousands, decimal) = self.separators();
        let cents = (amount.abs() * 100.0).round() as u64;
        let units = (cents / 100).to_string();

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, digit) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push(thousands);
            }
            grouped.push(digit);
        }

        let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
        format!(
            "{sign}{CURRENCY_SYMBOL} {grouped}{decimal}{:02}",
            cents % 100
        )
    }
}

/// Parses a `1.000,00` style amount: dots are grouping, the comma is the decimal mark.
pub fn parse_local_amount(raw: &str) -> Result<f64, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::validation(MISSING_VALUE));
    }
    let normalized = raw.replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && (amount.abs() * 100.0).round() <= MAX_EXACT_CENTS)
        .ok_or_else(|| ApiError::validation(INVALID_VALUE))
}
