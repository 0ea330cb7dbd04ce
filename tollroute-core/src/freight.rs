//! Freight tariff lookup across the axle × cargo matrix.

use std::collections::BTreeMap;

use crate::output::FreightEntry;
use crate::poi::FreightLoadRow;

impl FreightLoadRow {
    /// Rate column for `axles`.
    ///
    /// Columns exist for 2–7 and 9 axles; eight axles read the seven-axle
    /// column and anything else falls back to two axles.
    #[must_use]
    pub fn rate_for(&self, axles: u8) -> &str {
        match axles {
            3 => &self.three_axes,
            4 => &self.four_axes,
            5 => &self.five_axes,
            6 => &self.six_axes,
            7 | 8 => &self.seven_axes,
            9 => &self.nine_axes,
            _ => &self.two_axes,
        }
    }
}

/// Parse a stored rate, accepting a comma as decimal separator.
///
/// Unparsable rates read as zero.
///
/// # Examples
///
/// ```
/// use tollroute_core::freight::parse_rate;
///
/// assert!((parse_rate("4,25") - 4.25).abs() < f64::EPSILON);
/// assert!((parse_rate("n/a")).abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn parse_rate(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse().unwrap_or(0.0)
}

/// Freight totals for a route of `distance_km`, grouped by cargo category.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "tariffs are fractional currency")]
pub fn freight_table(
    rows: &[FreightLoadRow],
    axles: u8,
    distance_km: f64,
) -> BTreeMap<String, Vec<FreightEntry>> {
    let mut grouped: BTreeMap<String, Vec<FreightEntry>> = BTreeMap::new();
    for row in rows {
        let total = parse_rate(row.rate_for(axles)) * distance_km;
        grouped.entry(row.name.clone()).or_default().push(FreightEntry {
            description: row.description.clone(),
            type_of_load: row.type_of_load.clone(),
            qtd_axle: axles,
            total_value: (total * 100.0).round() / 100.0,
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn row() -> FreightLoadRow {
        FreightLoadRow {
            name: "Granel sólido".to_owned(),
            type_of_load: "Carga geral".to_owned(),
            description: "Tabela A".to_owned(),
            two_axes: "2,00".to_owned(),
            three_axes: "3.00".to_owned(),
            four_axes: "4".to_owned(),
            five_axes: "5,5".to_owned(),
            six_axes: "6".to_owned(),
            seven_axes: "7,25".to_owned(),
            nine_axes: "x".to_owned(),
        }
    }

    #[rstest]
    #[case(2, "2,00")]
    #[case(5, "5,5")]
    #[case(8, "7,25")]
    #[case(1, "2,00")]
    #[case(9, "x")]
    fn selects_rate_column(row: FreightLoadRow, #[case] axles: u8, #[case] expected: &str) {
        assert_eq!(row.rate_for(axles), expected);
    }

    #[rstest]
    fn groups_and_rounds(row: FreightLoadRow) {
        let mut other = row.clone();
        other.description = "Tabela B".to_owned();
        let table = freight_table(&[row, other], 8, 10.333);
        let entries = table.get("Granel sólido").expect("category present");
        assert_eq!(entries.len(), 2);
        assert!((entries[0].total_value - 74.91).abs() < 1e-9);
        assert_eq!(entries[0].qtd_axle, 8);
    }

    #[rstest]
    fn unparsable_rate_is_zero(row: FreightLoadRow) {
        let table = freight_table(&[row], 9, 100.0);
        let total = table.values().flatten().map(|e| e.total_value).sum::<f64>();
        assert!(total.abs() < f64::EPSILON);
    }
}
