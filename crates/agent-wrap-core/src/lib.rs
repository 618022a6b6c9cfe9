use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("cell is empty or not text")]
    EmptyCell,
    #[error("malformed JSON list: {0}")]
    MalformedJson(String),
}

pub const DAYS_IN_YEAR: usize = 365;
pub const MONTH_LENGTHS: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Day-of-year index 0 falls on a Wednesday in a Monday=0..Sunday=6 scheme.
pub const ANCHOR_WEEKDAY: usize = 2;

pub const COUNTRY_CODE_PREFIX: &str = "91";
pub const LOCAL_IDENTIFIER_LEN: usize = 10;

/// Prices above this are assumed to be mislabeled resale data even when they
/// arrive in the rental column.
pub const HIGH_VALUE_PRICE_THRESHOLD: i64 = 5_000_000;

pub const DATE_SENTINEL: &str = "-";
pub const DEFAULT_ZONE: &str = "North";
pub const DEFAULT_MICROMARKET: &str = "-";
pub const DEFAULT_ASSET_TYPE: &str = "Apartment";
pub const DEFAULT_CONFIGURATION: &str = "2 BHK";
pub const DEFAULT_AGENT_NAME: &str = "Agent";

/// Identifier lives in column A of the activity range and column B of the
/// profile range.
pub const ACTIVITY_IDENTIFIER_COLUMN: usize = 0;
pub const PROFILE_IDENTIFIER_COLUMN: usize = 1;

const WEEKDAY_NAMES: [&str; 7] =
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const SHORT_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none]");
const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const SLASH_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

// ---------------------------------------------------------------------------
// Identity Resolver
// ---------------------------------------------------------------------------

/// Strip `+`, spaces, and hyphens from a phone-number-like identifier.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars().filter(|ch| !matches!(ch, '+' | ' ' | '-')).collect()
}

/// Canonical search keys for one identifier: the normalized value, plus the
/// country-code-prefixed variant for bare 10-digit numbers, plus the
/// unprefixed variant for 12-digit numbers that already carry the prefix.
#[must_use]
pub fn candidate_identifiers(raw: &str) -> Vec<String> {
    let normalized = normalize_identifier(raw);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![normalized.clone()];
    let length = normalized.chars().count();
    if length == LOCAL_IDENTIFIER_LEN {
        candidates.push(format!("{COUNTRY_CODE_PREFIX}{normalized}"));
    } else if length == LOCAL_IDENTIFIER_LEN + COUNTRY_CODE_PREFIX.len() {
        if let Some(rest) = normalized.strip_prefix(COUNTRY_CODE_PREFIX) {
            candidates.push(rest.to_string());
        }
    }
    candidates
}

/// Fuzzy suffix policy tolerating inconsistent country-code prefixing: a
/// stored identifier matches when it equals a candidate, ends with a
/// candidate, or a candidate ends with the stored identifier's last 10
/// characters. Empty stored cells never match.
#[must_use]
pub fn identifier_matches(stored_raw: &str, candidates: &[String]) -> bool {
    let stored = normalize_identifier(stored_raw);
    if stored.is_empty() {
        return false;
    }

    let tail_start = stored
        .char_indices()
        .rev()
        .nth(LOCAL_IDENTIFIER_LEN - 1)
        .map_or(0, |(index, _)| index);
    let stored_suffix = &stored[tail_start..];

    candidates.iter().any(|candidate| {
        stored == *candidate
            || stored.ends_with(candidate.as_str())
            || candidate.ends_with(stored_suffix)
    })
}

/// First matching data row in row order; row 0 is the header and is skipped.
#[must_use]
pub fn find_matching_row<'a>(
    rows: &'a [Vec<Value>],
    identifier_column: usize,
    candidates: &[String],
) -> Option<&'a Vec<Value>> {
    rows.iter().skip(1).find(|row| {
        cell_str(row, identifier_column)
            .is_some_and(|stored| identifier_matches(&stored, candidates))
    })
}

// ---------------------------------------------------------------------------
// Row Decoder
// ---------------------------------------------------------------------------

/// Non-empty textual content of a cell. Numbers are rendered as text since
/// the sheet reports identifiers and counts inconsistently.
#[must_use]
pub fn cell_str(row: &[Value], index: usize) -> Option<String> {
    match row.get(index)? {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Integer content of a cell; 0 when absent, malformed, or non-numeric.
#[must_use]
pub fn cell_i64(row: &[Value], index: usize) -> i64 {
    match row.get(index) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))
            .unwrap_or(0),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|value| value as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Calendar date from a cell, accepting `YYYY-MM-DD`, `M/D/YYYY`, and
/// datetime strings whose date part matches either form.
#[must_use]
pub fn parse_cell_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    Date::parse(date_part, ISO_DATE)
        .ok()
        .or_else(|| Date::parse(date_part, SLASH_DATE).ok())
}

/// Short `"Mon D"` label, e.g. `"Jan 3"`.
#[must_use]
pub fn short_date_label(date: Date) -> String {
    date.format(SHORT_DATE).unwrap_or_else(|_| DATE_SENTINEL.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Which JSON-in-cell schema a breakdown cell uses.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LabelKey {
    Zone,
    Micromarket,
    AssetType,
    Bedrooms,
}

#[derive(Debug, Deserialize)]
struct ZoneEntry {
    zone: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct MicromarketEntry {
    micromarket: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct AssetTypeEntry {
    #[serde(rename = "assetType")]
    asset_type: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct BedroomsEntry {
    bedrooms: String,
    #[serde(default)]
    count: i64,
}

fn decode_entries<T, F>(raw: &Value, map: F) -> Result<Vec<LabelCount>, DecodeError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> LabelCount,
{
    let parsed: Vec<T> = match raw {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|err| DecodeError::MalformedJson(err.to_string()))?,
        Value::Array(_) => serde_json::from_value(raw.clone())
            .map_err(|err| DecodeError::MalformedJson(err.to_string()))?,
        _ => return Err(DecodeError::EmptyCell),
    };
    Ok(parsed.into_iter().map(map).collect())
}

/// Schema-validated decode of one `{label, count}` breakdown cell. The caller
/// maps failure to an empty list so one malformed cell never blanks out
/// sibling fields.
///
/// # Errors
/// Returns [`DecodeError::EmptyCell`] when the cell is absent or blank, and
/// [`DecodeError::MalformedJson`] when its text is not a JSON list of the
/// expected shape.
pub fn decode_label_counts(
    cell: Option<&Value>,
    key: LabelKey,
) -> Result<Vec<LabelCount>, DecodeError> {
    let raw = match cell {
        Some(Value::String(text)) if text.trim().is_empty() => {
            return Err(DecodeError::EmptyCell)
        }
        Some(value @ (Value::String(_) | Value::Array(_))) => value,
        _ => return Err(DecodeError::EmptyCell),
    };

    match key {
        LabelKey::Zone => decode_entries(raw, |entry: ZoneEntry| LabelCount {
            label: entry.zone,
            count: entry.count,
        }),
        LabelKey::Micromarket => decode_entries(raw, |entry: MicromarketEntry| LabelCount {
            label: entry.micromarket,
            count: entry.count,
        }),
        LabelKey::AssetType => decode_entries(raw, |entry: AssetTypeEntry| LabelCount {
            label: entry.asset_type,
            count: entry.count,
        }),
        LabelKey::Bedrooms => decode_entries(raw, |entry: BedroomsEntry| LabelCount {
            label: entry.bedrooms,
            count: entry.count,
        }),
    }
}

// ---------------------------------------------------------------------------
// Calendar Reconstructor
// ---------------------------------------------------------------------------

/// Per-month day-activity vectors reconstructed from the day-wise bitstring.
/// Month vectors are variable-length (28-31) per the non-leap month table, so
/// the flattened calendar is exactly 365 day slots.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ActivityCalendar {
    pub months: Vec<Vec<u8>>,
}

impl ActivityCalendar {
    /// Walk the 365 logical day slots in order, slotting each into its owning
    /// month. Characters beyond index 365 are ignored; missing trailing days
    /// are inactive.
    #[must_use]
    pub fn from_daywise(daywise: &str) -> Self {
        let bytes = daywise.as_bytes();
        let mut months = Vec::with_capacity(MONTH_LENGTHS.len());
        let mut day_of_year = 0_usize;
        for month_length in MONTH_LENGTHS {
            let mut month = Vec::with_capacity(month_length);
            for _ in 0..month_length {
                let active = bytes.get(day_of_year) == Some(&b'1');
                month.push(u8::from(active));
                day_of_year += 1;
            }
            months.push(month);
        }
        Self { months }
    }

    #[must_use]
    pub fn active_days(&self) -> usize {
        self.months
            .iter()
            .map(|month| month.iter().filter(|day| **day > 0).count())
            .sum()
    }

    /// Active-day tally per weekday, Monday=0..Sunday=6, anchored so that
    /// day-of-year 0 is a Wednesday.
    #[must_use]
    pub fn weekday_counts(&self) -> [u32; 7] {
        let mut counts = [0_u32; 7];
        for (day_of_year, day) in self.months.iter().flatten().enumerate() {
            if *day > 0 {
                counts[(ANCHOR_WEEKDAY + day_of_year) % 7] += 1;
            }
        }
        counts
    }

    /// Weekday with the most active days; ties resolve to the lowest index.
    #[must_use]
    pub fn peak_weekday(&self) -> &'static str {
        let counts = self.weekday_counts();
        let mut best_index = 0_usize;
        for (index, count) in counts.iter().enumerate() {
            if *count > counts[best_index] {
                best_index = index;
            }
        }
        WEEKDAY_NAMES[best_index]
    }

    /// Month with the most active days; ties resolve to the earliest month.
    #[must_use]
    pub fn top_month(&self) -> &'static str {
        let mut best_index = 0_usize;
        let mut best_total = 0_usize;
        for (index, month) in self.months.iter().enumerate() {
            let total = month.iter().filter(|day| **day > 0).count();
            if total > best_total {
                best_total = total;
                best_index = index;
            }
        }
        MONTH_NAMES[best_index]
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StreakSpan {
    pub start_label: String,
    pub end_label: String,
}

/// Start/end labels for the longest streak. The end date is start plus
/// `length_days - 1`; either label degrades to the `"-"` sentinel when its
/// inputs are missing.
#[must_use]
pub fn derive_streak_span(start: Option<Date>, length_days: i64) -> StreakSpan {
    let start_label = start.map_or_else(|| DATE_SENTINEL.to_string(), short_date_label);
    let end_label = match start {
        Some(start_date) if length_days > 0 => start_date
            .checked_add(Duration::days(length_days - 1))
            .map_or_else(|| DATE_SENTINEL.to_string(), short_date_label),
        _ => DATE_SENTINEL.to_string(),
    };
    StreakSpan { start_label, end_label }
}

// ---------------------------------------------------------------------------
// Aggregate Derivers
// ---------------------------------------------------------------------------

fn best_and_total<'a, I>(entries: I) -> (Option<&'a LabelCount>, i64)
where
    I: IntoIterator<Item = &'a LabelCount>,
{
    let mut best: Option<&LabelCount> = None;
    let mut total = 0_i64;
    for entry in entries {
        total += entry.count;
        // Strict `>` so later equal entries never replace an earlier max.
        if best.map_or(true, |current| entry.count > current.count) {
            best = Some(entry);
        }
    }
    (best, total)
}

/// Shared top-of-pairs policy: the first strict-max entry plus the total of
/// all counts. `None` for an empty list.
#[must_use]
pub fn top_of_pairs(entries: &[LabelCount]) -> Option<(&LabelCount, i64)> {
    let (best, total) = best_and_total(entries);
    best.map(|entry| (entry, total))
}

fn percentage(part: i64, total: i64) -> u8 {
    if part <= 0 || total <= 0 {
        return 0;
    }
    let ratio = 100.0 * part as f64 / total as f64;
    ratio.round().clamp(0.0, 100.0) as u8
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

const ZONE_KEYWORDS: [&str; 5] = ["north", "south", "east", "west", "central"];

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ZoneSummary {
    pub top_zone: String,
    pub top_zone_pct: u8,
    pub zone_deals: i64,
}

/// Zone policy: only recognized compass-direction labels count, labels naming
/// "unknown"/"not specified" buckets are dropped, and the percentage is over
/// the filtered total. A trailing " Bangalore" is stripped for display.
#[must_use]
pub fn derive_zone(zones: &[LabelCount]) -> ZoneSummary {
    let recognized = zones.iter().filter(|entry| {
        let name = entry.label.to_lowercase();
        ZONE_KEYWORDS.iter().any(|keyword| name.contains(keyword))
            && !name.contains("unknown")
            && !name.contains("specif")
    });
    let (best, total) = best_and_total(recognized);
    match best {
        Some(entry) => ZoneSummary {
            top_zone: entry.label.replace(" Bangalore", "").trim().to_string(),
            top_zone_pct: percentage(entry.count, total),
            zone_deals: entry.count,
        },
        None => ZoneSummary { top_zone: DEFAULT_ZONE.to_string(), top_zone_pct: 0, zone_deals: 0 },
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MicromarketSummary {
    pub top_micromarkets: String,
    pub micromarket_pct: u8,
    pub micromarket_count: i64,
}

/// Top three micromarkets by count (zero-count entries excluded, stable order
/// for ties), joined for display; percentage is their share of the total
/// across all entries.
#[must_use]
pub fn derive_micromarkets(entries: &[LabelCount]) -> MicromarketSummary {
    let total: i64 = entries.iter().map(|entry| entry.count).sum();
    let mut ranked: Vec<&LabelCount> = entries.iter().filter(|entry| entry.count > 0).collect();
    ranked.sort_by(|lhs, rhs| rhs.count.cmp(&lhs.count));
    ranked.truncate(3);

    if ranked.is_empty() {
        return MicromarketSummary {
            top_micromarkets: DEFAULT_MICROMARKET.to_string(),
            micromarket_pct: 0,
            micromarket_count: 0,
        };
    }

    let names = ranked.iter().map(|entry| entry.label.as_str()).collect::<Vec<_>>().join(", ");
    let top_sum: i64 = ranked.iter().map(|entry| entry.count).sum();
    MicromarketSummary {
        top_micromarkets: names,
        micromarket_pct: percentage(top_sum, total),
        micromarket_count: ranked.first().map_or(0, |entry| entry.count),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EnquiryLeaning {
    Buyer,
    Seller,
}

impl EnquiryLeaning {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }

    #[must_use]
    pub fn action_label(self) -> &'static str {
        match self {
            Self::Buyer => "enquiries sent",
            Self::Seller => "enquiries received",
        }
    }

    #[must_use]
    pub fn style_label(self) -> &'static str {
        match self {
            Self::Buyer => "You spent more time finding properties for your buyers",
            Self::Seller => "You spent more time getting properties sold for your sellers",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EnquiryMix {
    pub sent: i64,
    pub received: i64,
    pub sent_pct: u8,
    pub received_pct: u8,
    pub leaning: EnquiryLeaning,
    pub dominant_pct: u8,
}

/// Buyer-leaning when the sent share is at least half (a 50/50 tie counts as
/// buyer-leaning); the displayed percentage is the dominant side's.
#[must_use]
pub fn derive_enquiry_mix(sent: i64, received: i64) -> EnquiryMix {
    let total = sent + received;
    let sent_pct = percentage(sent, total);
    let received_pct = percentage(received, total);
    let leaning =
        if sent_pct >= 50 { EnquiryLeaning::Buyer } else { EnquiryLeaning::Seller };
    let dominant_pct = match leaning {
        EnquiryLeaning::Buyer => sent_pct,
        EnquiryLeaning::Seller => received_pct,
    };
    EnquiryMix { sent, received, sent_pct, received_pct, leaning, dominant_pct }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DealLeaning {
    Resale,
    Rental,
}

impl DealLeaning {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resale => "resale",
            Self::Rental => "rental",
        }
    }

    #[must_use]
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Resale => "resale",
            Self::Rental => "rentals",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DealMix {
    pub resale: i64,
    pub rental: i64,
    pub resale_pct: u8,
    pub rental_pct: u8,
    pub leaning: DealLeaning,
    pub dominant_pct: u8,
}

/// Resale-leaning when the resale share is at least half.
#[must_use]
pub fn derive_deal_mix(resale: i64, rental: i64) -> DealMix {
    let total = resale + rental;
    let resale_pct = percentage(resale, total);
    let rental_pct = percentage(rental, total);
    let leaning = if resale_pct >= 50 { DealLeaning::Resale } else { DealLeaning::Rental };
    let dominant_pct = match leaning {
        DealLeaning::Resale => resale_pct,
        DealLeaning::Rental => rental_pct,
    };
    DealMix { resale, rental, resale_pct, rental_pct, leaning, dominant_pct }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Resale,
    Rental,
}

impl PriceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resale => "Resale",
            Self::Rental => "Rental",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PriceSummary {
    pub amount: i64,
    pub price_type: PriceType,
    pub label: String,
}

/// Prefer the resale average when nonzero, fall back to the rental average.
/// Amounts above [`HIGH_VALUE_PRICE_THRESHOLD`] are relabeled as resale no
/// matter which column they came from.
#[must_use]
pub fn derive_price(resale_avg: i64, rental_avg: i64) -> PriceSummary {
    let (amount, mut price_type) = if resale_avg > 0 {
        (resale_avg, PriceType::Resale)
    } else if rental_avg > 0 {
        (rental_avg, PriceType::Rental)
    } else {
        (0, PriceType::Resale)
    };
    if amount > HIGH_VALUE_PRICE_THRESHOLD {
        price_type = PriceType::Resale;
    }
    PriceSummary { amount, price_type, label: format_price(amount) }
}

fn trim_decimal(value: f64, places: usize) -> String {
    let text = format!("{value:.places$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Tiered magnitude formatting: crore above 10,000,000, lakh above 100,000,
/// thousand above 1,000, collapsing trailing `.0`/`.00`.
#[must_use]
pub fn format_price(amount: i64) -> String {
    if amount >= 10_000_000 {
        format!("₹{} Cr", trim_decimal(amount as f64 / 10_000_000.0, 2))
    } else if amount >= 100_000 {
        format!("₹{} L", trim_decimal(amount as f64 / 100_000.0, 2))
    } else if amount >= 1_000 {
        format!("₹{} K", trim_decimal(amount as f64 / 1_000.0, 1))
    } else {
        format!("₹{amount}")
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AssetTypeSummary {
    pub top_asset_type: String,
    pub asset_type_pct: u8,
}

#[must_use]
pub fn derive_asset_types(entries: &[LabelCount]) -> AssetTypeSummary {
    match top_of_pairs(entries) {
        Some((best, total)) => AssetTypeSummary {
            top_asset_type: capitalize_first(&best.label),
            asset_type_pct: percentage(best.count, total),
        },
        None => AssetTypeSummary {
            top_asset_type: DEFAULT_ASSET_TYPE.to_string(),
            asset_type_pct: 0,
        },
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfigurationSummary {
    pub top_configuration: String,
    pub config_pct: u8,
}

#[must_use]
pub fn derive_configurations(entries: &[LabelCount]) -> ConfigurationSummary {
    match top_of_pairs(entries) {
        Some((best, total)) => {
            let label = if best.label == "Not Specified" {
                "Mixed".to_string()
            } else {
                format!("{} BHK", best.label)
            };
            ConfigurationSummary {
                top_configuration: label,
                config_pct: percentage(best.count, total),
            }
        }
        None => ConfigurationSummary {
            top_configuration: DEFAULT_CONFIGURATION.to_string(),
            config_pct: 0,
        },
    }
}

// ---------------------------------------------------------------------------
// Record Assembler
// ---------------------------------------------------------------------------

/// The canonical derived output. Every field backed by an absent source row
/// stays `None` and is omitted from serialized output instead of being
/// zero-filled. Construction is deterministic: identical rows in, identical
/// JSON out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct AgentSummary {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_active: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_streak: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_data: Option<Vec<Vec<u8>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday_counts: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_weekday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_month: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_zone_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_deals: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_micromarkets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micromarket_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micromarket_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiries_sent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiries_received: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiry_leaning: Option<EnquiryLeaning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiry_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiry_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiry_style: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resale_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_leaning: Option<DealLeaning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_asset_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_pct: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resale_avg_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resale_min_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resale_max_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_avg_rent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_min_rent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_max_rent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_price_type: Option<PriceType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bestie_cp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bestie_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bestie_mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bestie_count: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_properties: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_enquiries: Option<i64>,
}

impl AgentSummary {
    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }
}

fn apply_activity_fields(summary: &mut AgentSummary, row: &[Value]) {
    let days_active = cell_i64(row, 1);
    let longest_streak = cell_i64(row, 2);
    let streak_start = cell_str(row, 3).and_then(|raw| parse_cell_date(&raw));
    let daywise = cell_str(row, 4).unwrap_or_default();

    let calendar = ActivityCalendar::from_daywise(&daywise);
    let span = derive_streak_span(streak_start, longest_streak);

    summary.days_active = Some(days_active);
    summary.longest_streak = Some(longest_streak);
    summary.streak_start_date = Some(span.start_label);
    summary.streak_end_date = Some(span.end_label);
    summary.weekday_counts = Some(calendar.weekday_counts().to_vec());
    summary.peak_weekday = Some(calendar.peak_weekday().to_string());
    summary.top_month = Some(calendar.top_month().to_string());
    summary.activity_data = Some(calendar.months);
}

fn apply_profile_fields(summary: &mut AgentSummary, row: &[Value]) {
    summary.cp_id = cell_str(row, 0);
    summary.agent_name =
        Some(cell_str(row, 2).unwrap_or_else(|| DEFAULT_AGENT_NAME.to_string()));

    let zones = decode_label_counts(row.get(3), LabelKey::Zone).unwrap_or_default();
    let zone = derive_zone(&zones);
    summary.top_zone = Some(zone.top_zone);
    summary.top_zone_pct = Some(zone.top_zone_pct);
    summary.zone_deals = Some(zone.zone_deals);

    let micromarkets =
        decode_label_counts(row.get(4), LabelKey::Micromarket).unwrap_or_default();
    let micromarket = derive_micromarkets(&micromarkets);
    summary.top_micromarkets = Some(micromarket.top_micromarkets);
    summary.micromarket_pct = Some(micromarket.micromarket_pct);
    summary.micromarket_count = Some(micromarket.micromarket_count);

    let sent = cell_i64(row, 5);
    let received = cell_i64(row, 6);
    let enquiry = derive_enquiry_mix(sent, received);
    summary.enquiries_sent = Some(sent);
    summary.enquiries_received = Some(received);
    summary.enquiry_leaning = Some(enquiry.leaning);
    summary.enquiry_pct = Some(enquiry.dominant_pct);
    summary.enquiry_action = Some(enquiry.leaning.action_label().to_string());
    summary.enquiry_style = Some(enquiry.leaning.style_label().to_string());

    let resale = cell_i64(row, 7);
    let rental = cell_i64(row, 8);
    let deals = derive_deal_mix(resale, rental);
    summary.resale_count = Some(resale);
    summary.rental_count = Some(rental);
    summary.deal_leaning = Some(deals.leaning);
    summary.deal_pct = Some(deals.dominant_pct);
    summary.deal_label = Some(deals.leaning.display_label().to_string());

    let assets = decode_label_counts(row.get(9), LabelKey::AssetType).unwrap_or_default();
    let asset = derive_asset_types(&assets);
    summary.top_asset_type = Some(asset.top_asset_type);
    summary.asset_type_pct = Some(asset.asset_type_pct);

    let configurations =
        decode_label_counts(row.get(10), LabelKey::Bedrooms).unwrap_or_default();
    let configuration = derive_configurations(&configurations);
    summary.top_configuration = Some(configuration.top_configuration);
    summary.config_pct = Some(configuration.config_pct);

    let resale_avg = cell_i64(row, 11);
    let rental_avg = cell_i64(row, 14);
    summary.resale_avg_price = Some(resale_avg);
    summary.resale_min_price = Some(cell_i64(row, 12));
    summary.resale_max_price = Some(cell_i64(row, 13));
    summary.rental_avg_rent = Some(rental_avg);
    summary.rental_min_rent = Some(cell_i64(row, 15));
    summary.rental_max_rent = Some(cell_i64(row, 16));
    let price = derive_price(resale_avg, rental_avg);
    summary.market_price = Some(price.label);
    summary.market_price_type = Some(price.price_type);

    summary.bestie_cp_id = cell_str(row, 17);
    summary.bestie_name =
        Some(cell_str(row, 18).unwrap_or_else(|| DATE_SENTINEL.to_string()));
    summary.bestie_mobile = cell_str(row, 19);
    summary.bestie_count = Some(cell_i64(row, 20));

    summary.total_properties = Some(resale + rental);
    summary.total_enquiries = Some(sent + received);
}

/// Merge both matched rows into one canonical record. Fields populate
/// independently per source; `found` is true when either row matched.
#[must_use]
pub fn assemble_summary(
    identifier: &str,
    activity_row: Option<&[Value]>,
    profile_row: Option<&[Value]>,
) -> AgentSummary {
    let found = activity_row.is_some() || profile_row.is_some();
    let mut summary = AgentSummary { found, ..AgentSummary::default() };
    if !found {
        return summary;
    }

    summary.mobile = Some(identifier.to_string());
    if let Some(row) = activity_row {
        apply_activity_fields(&mut summary, row);
    }
    if let Some(row) = profile_row {
        apply_profile_fields(&mut summary, row);
    }
    summary
}
