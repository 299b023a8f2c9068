//! Shared domain types.
//!
//! Raw source records (`RawBond`, `RawRate`) mirror the JSON published by the
//! catalog and exchange-rate sources. Everything downstream works with the
//! normalized, explicitly typed tables defined here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency every payment is converted into.
pub const BASE_CURRENCY: &str = "UAH";

/// Prefix shared by every ISIN sold at the state bond auction.
pub const ISIN_PREFIX: &str = "UA4000";

/// Numeric currency codes (ISO 4217) kept from the exchange-rate source.
pub const SOURCE_CURRENCIES: [u16; 2] = [840, 978];

/// One payment event as published in the bond catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayment {
    #[serde(with = "flexible_date")]
    pub pay_date: NaiveDate,
    pub pay_val: f64,
}

/// One bond instrument as published in the catalog, payments still nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBond {
    #[serde(rename = "cpcode")]
    pub isin: String,
    #[serde(default)]
    pub nominal: Option<f64>,
    #[serde(rename = "razm_date", default, with = "flexible_date::option")]
    pub issue_date: Option<NaiveDate>,
    #[serde(rename = "pgs_date", default, with = "flexible_date::option")]
    pub maturity_date: Option<NaiveDate>,
    #[serde(rename = "cpdescr", default)]
    pub bond_type: String,
    #[serde(rename = "cptype", default)]
    pub security_kind: String,
    #[serde(rename = "val_code")]
    pub currency: String,
    /// Coupon period in days.
    #[serde(default)]
    pub pay_period: Option<u32>,
    #[serde(default)]
    pub payments: Vec<RawPayment>,
}

/// One exchange-rate record from the rate source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRate {
    pub r030: u16,
    pub cc: String,
    pub rate: f64,
    #[serde(default)]
    pub exchangedate: Option<String>,
}

/// Currency code → rate in [`BASE_CURRENCY`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    rates: BTreeMap<String, f64>,
}

impl ExchangeRates {
    /// Rates containing only the base currency.
    pub fn base_only() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(BASE_CURRENCY.to_string(), 1.0);
        Self { rates }
    }

    /// Build from source records, keeping the listed numeric codes.
    ///
    /// The base currency is synthesized with rate 1.0 when the source omits it.
    pub fn from_source(records: &[RawRate], codes: &[u16]) -> Self {
        let mut out = Self::base_only();
        for r in records.iter().filter(|r| codes.contains(&r.r030)) {
            if r.rate.is_finite() && r.rate > 0.0 {
                out.rates.insert(r.cc.trim().to_ascii_uppercase(), r.rate);
            }
        }
        out
    }

    pub fn with_rate(mut self, currency: &str, rate: f64) -> Self {
        self.rates.insert(currency.to_ascii_uppercase(), rate);
        self
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(&currency.trim().to_ascii_uppercase()).copied()
    }
}

/// Normalized catalog row: one per (ISIN, payment date).
#[derive(Debug, Clone, PartialEq)]
pub struct BondDefinition {
    pub isin: String,
    pub nominal: Option<f64>,
    pub issue_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub bond_type: String,
    pub security_kind: String,
    pub pay_period: Option<u32>,
    pub currency: String,
    pub pay_date: NaiveDate,
    /// Payment per bond, native currency, summed over same-date events.
    pub pay_val: f64,
    pub exchange_rate: f64,
    pub month_end: NaiveDate,
}

impl BondDefinition {
    /// Payment per bond in the base currency.
    pub fn base_pay_val(&self) -> f64 {
        self.pay_val * self.exchange_rate
    }
}

/// A validated row of the user's bag file.
#[derive(Debug, Clone, PartialEq)]
pub struct BagRow {
    pub isin: String,
    pub quantity: u64,
    /// Total acquisition cost in base currency.
    pub expenditure: f64,
    /// Profit tax rate as a fraction (0..=1).
    pub tax: f64,
}

/// Catalog payment attached to a held position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionPayment {
    pub pay_date: NaiveDate,
    pub pay_val: f64,
    pub month_end: NaiveDate,
    pub bond_type: String,
    pub currency: String,
    pub exchange_rate: f64,
    /// `pay_val × quantity × exchange_rate`.
    pub total_pay_val: f64,
}

/// A bag row joined with one catalog payment (or none, when matured/unknown).
#[derive(Debug, Clone, PartialEq)]
pub struct HeldPosition {
    pub bag: BagRow,
    pub payment: Option<PositionPayment>,
}

impl HeldPosition {
    pub fn isin(&self) -> &str {
        &self.bag.isin
    }

    pub fn is_matured(&self) -> bool {
        self.payment.is_none()
    }
}

/// A row of the forward payment schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub isin: String,
    pub bond_type: String,
    pub currency: String,
    /// `DD-MM-YYYY`.
    pub pay_date: String,
    /// Base-currency amount, rounded to cents.
    pub total_pay_val: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyPoint {
    pub month_end: NaiveDate,
    pub value: f64,
}

/// Payments summed per calendar month, ordered by month end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlySeries {
    points: Vec<MonthlyPoint>,
}

impl MonthlySeries {
    /// Build from points; they are sorted by month but not merged.
    pub fn from_points(mut points: Vec<MonthlyPoint>) -> Self {
        points.sort_by_key(|p| p.month_end);
        Self { points }
    }

    pub fn points(&self) -> &[MonthlyPoint] {
        &self.points
    }

    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|p| (p.month_end, p.value))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.month_end)
    }

    pub fn last_month(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.month_end)
    }

    pub fn value_at(&self, month_end: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&month_end, |p| p.month_end)
            .ok()
            .map(|idx| self.points[idx].value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Average monthly value; `None` for an empty series.
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.total() / self.points.len() as f64)
    }
}

/// Profit figures of one held position (or of the total row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionProfit {
    pub profit_before_tax: f64,
    pub profit_after_tax: f64,
    pub profit_per_unit: f64,
    pub profitability_pct: f64,
}

/// One active ISIN of the bag with its analytics.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub bag: BagRow,
    pub bond_type: String,
    pub currency: String,
    /// Latest scheduled payment (redemption) date.
    pub last_pay_date: NaiveDate,
    pub expected_return: f64,
    pub profit: PositionProfit,
}

/// Synthetic row aggregating every active position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalRow {
    pub quantity: u64,
    pub expenditure: f64,
    pub expected_return: f64,
    pub profit_before_tax: f64,
    pub profit_after_tax: f64,
    pub profitability_pct: f64,
}

/// The processed bag: active positions, their total and matured holdings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BagSummary {
    pub active: Vec<PositionReport>,
    pub total: Option<TotalRow>,
    pub matured: Vec<BagRow>,
}

/// Why a bond was recommended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecommendReason {
    /// Its payment lands in a month at or below the bag's monthly average.
    UnderloadedMonth { baseline_value: f64 },
    /// Its payment lands after the last month the bag pays in.
    BeyondHorizon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCandidate {
    /// The bond's most valuable remaining payment.
    pub bond: BondDefinition,
    pub reason: RecommendReason,
}

/// ISINs offered at the upcoming auction, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionCandidateSet {
    pub isins: Vec<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl AuctionCandidateSet {
    pub fn new(isins: Vec<String>) -> Self {
        Self {
            isins,
            source_url: None,
        }
    }

    pub fn len(&self) -> usize {
        self.isins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isins.is_empty()
    }

    pub fn contains(&self, isin: &str) -> bool {
        self.isins.iter().any(|i| i == isin)
    }

    /// Purchase amounts aligned with `isins`, all zero.
    pub fn zero_amounts(&self) -> Vec<u32> {
        vec![0; self.isins.len()]
    }
}

/// Raw sources fetched once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub tool: String,
    pub fetched_on: NaiveDate,
    pub bonds: Vec<RawBond>,
    pub rates: Vec<RawRate>,
    #[serde(default)]
    pub auction: AuctionCandidateSet,
}

impl MarketSnapshot {
    pub fn exchange_rates(&self) -> ExchangeRates {
        ExchangeRates::from_source(&self.rates, &SOURCE_CURRENCIES)
    }
}

/// Where the bag comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagSource {
    File(PathBuf),
    Example,
}

/// A run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Payments strictly before this date are dropped.
    pub asof_date: NaiveDate,
    /// Read sources from this snapshot instead of fetching them.
    pub snapshot_path: Option<PathBuf>,
    pub bag: BagSource,
}

/// A hypothetical purchase of `amount` bonds of one ISIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub isin: String,
    pub amount: u32,
}

impl std::str::FromStr for Purchase {
    type Err = String;

    /// Parse `ISIN=AMOUNT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (isin, amount) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ISIN=AMOUNT, got '{s}'"))?;
        let isin = isin.trim().to_ascii_uppercase();
        if isin.is_empty() {
            return Err(format!("missing ISIN in '{s}'"));
        }
        let amount = amount
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("amount must be a non-negative integer, got '{}'", amount.trim()))?;
        Ok(Self { isin, amount })
    }
}

/// Serde helpers for dates published as `YYYY-MM-DD[...]` or `DD.MM.YYYY`.
pub mod flexible_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        if let Some(head) = s.get(..10) {
            if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(d);
            }
        }
        NaiveDate::parse_from_str(s, "%d.%m.%Y").ok()
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => serializer.serialize_some(&d.format("%Y-%m-%d").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => super::parse(s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{s}'"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bond_parses_catalog_json() {
        let json = r#"{
            "cpcode": "UA4000227045",
            "nominal": 1000,
            "razm_date": "2023-01-11",
            "pgs_date": "2026-12-02T00:00:00",
            "cpdescr": "ОВДП",
            "cptype": "OVDP",
            "val_code": "UAH",
            "pay_period": 182,
            "emit_okpo": "00013480",
            "payments": [
                {"pay_date": "2026-06-03", "pay_type": 1, "pay_val": 97.5},
                {"pay_date": "02.12.2026", "pay_val": 1097.5}
            ]
        }"#;
        let bond: RawBond = serde_json::from_str(json).unwrap();
        assert_eq!(bond.isin, "UA4000227045");
        assert_eq!(bond.maturity_date, NaiveDate::from_ymd_opt(2026, 12, 2));
        assert_eq!(bond.payments.len(), 2);
        assert_eq!(bond.payments[1].pay_date, NaiveDate::from_ymd_opt(2026, 12, 2).unwrap());
    }

    #[test]
    fn exchange_rates_keep_selected_codes_and_base() {
        let records = vec![
            RawRate { r030: 840, cc: "USD".to_string(), rate: 41.5, exchangedate: None },
            RawRate { r030: 978, cc: "EUR".to_string(), rate: 45.0, exchangedate: None },
            RawRate { r030: 826, cc: "GBP".to_string(), rate: 52.0, exchangedate: None },
        ];
        let rates = ExchangeRates::from_source(&records, &SOURCE_CURRENCIES);
        assert_eq!(rates.rate("UAH"), Some(1.0));
        assert_eq!(rates.rate("usd"), Some(41.5));
        assert_eq!(rates.rate("EUR"), Some(45.0));
        assert_eq!(rates.rate("GBP"), None);
    }

    #[test]
    fn monthly_series_mean_and_lookup() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let series = MonthlySeries::from_points(vec![
            MonthlyPoint { month_end: d2, value: 30.0 },
            MonthlyPoint { month_end: d1, value: 10.0 },
        ]);
        assert_eq!(series.first_month(), Some(d1));
        assert_eq!(series.value_at(d2), Some(30.0));
        assert_eq!(series.mean(), Some(20.0));
        assert_eq!(MonthlySeries::default().mean(), None);
    }

    #[test]
    fn purchase_parses_isin_and_amount() {
        let p: Purchase = " ua4000227045 = 400".parse().unwrap();
        assert_eq!(p, Purchase { isin: "UA4000227045".to_string(), amount: 400 });
        assert!("UA4000227045".parse::<Purchase>().is_err());
        assert!("UA4000227045=-3".parse::<Purchase>().is_err());
        assert!("=5".parse::<Purchase>().is_err());
    }
}
