// ═══════════════════════════════════════════════════════════════════
// Model Tests — Cell, RawRow classification, DateRangeSpec, Ledger,
// LedgerSettings, BasketDefinition
// ═══════════════════════════════════════════════════════════════════

use chrono::{Duration, NaiveDate};

use nav_ledger_core::errors::CoreError;
use nav_ledger_core::models::basket::{BasketDefinition, BasketMember};
use nav_ledger_core::models::ledger::Ledger;
use nav_ledger_core::models::range::DateRangeSpec;
use nav_ledger_core::models::settings::{LedgerSettings, RetryPolicy, MAX_LOOKBACK_DAYS};
use nav_ledger_core::models::sheet::{Cell, MarkerKind, RawRow, Row};
use nav_ledger_core::models::valuation::ValuationRow;

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn vrow(date: NaiveDate, basket_value: f64, nav: f64) -> ValuationRow {
    ValuationRow {
        date,
        prices: vec![basket_value],
        basket_value,
        daily_return: 0.0,
        nav,
    }
}

/// `n` consecutive daily rows starting at `start`.
fn daily_rows(start: NaiveDate, n: i64) -> Vec<ValuationRow> {
    (0..n)
        .map(|i| vrow(start + Duration::days(i), 100.0 + i as f64, 100.0 + i as f64))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════
// Cell
// ═══════════════════════════════════════════════════════════════════

mod cell {
    use super::*;

    #[test]
    fn parse_blank_number_text() {
        assert_eq!(Cell::parse("   "), Cell::Empty);
        assert_eq!(Cell::parse("12.5"), Cell::Number(12.5));
        assert_eq!(Cell::parse(" AAPL "), Cell::Text("AAPL".into()));
    }

    #[test]
    fn non_finite_numbers_stay_text() {
        assert_eq!(Cell::parse("NaN"), Cell::Text("NaN".into()));
    }

    #[test]
    fn render_round_trips_numbers() {
        assert_eq!(Cell::Number(100.0).render(), "100");
        assert_eq!(Cell::Number(0.1).render(), "0.1");
        assert_eq!(Cell::parse(&Cell::Number(1.0 / 3.0).render()), Cell::Number(1.0 / 3.0));
        assert_eq!(Cell::Empty.render(), "");
    }

    #[test]
    fn unreadable_date_is_date_parse_error() {
        let err = Cell::text("not a date").to_date().unwrap_err();
        assert!(matches!(err, CoreError::DateParse(_)));
        assert!(matches!(Cell::Empty.to_date(), Err(CoreError::DateParse(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// RawRow classification
// ═══════════════════════════════════════════════════════════════════

mod classify {
    use super::*;

    #[test]
    fn stocks_marker() {
        let row = RawRow::from_fields(["", "Stocks", "AAA", "BBB", "", "", ""]);
        assert_eq!(row.marker(), Some(MarkerKind::Stocks));
        match row.classify() {
            Row::Marker(m) => {
                assert_eq!(m.kind, MarkerKind::Stocks);
                assert_eq!(m.payload.len(), 5);
                assert_eq!(m.payload[0], Cell::Text("AAA".into()));
            }
            other => panic!("expected marker, got {other:?}"),
        }
    }

    #[test]
    fn quantities_marker() {
        let row = RawRow::from_fields(["", "Quantities", "2", "3"]);
        assert!(row.is_marker(MarkerKind::Quantities));
    }

    #[test]
    fn marker_token_must_match_exactly() {
        let row = RawRow::from_fields(["2024-01-01", "stocks", "AAA"]);
        assert_eq!(row.marker(), None);
    }

    #[test]
    fn valuation_row() {
        let row = RawRow::from_fields([
            "2024-01-05", "", "10", "20", "", "", "", "80", "0.02", "102",
        ]);
        match row.classify() {
            Row::Valuation(v) => {
                assert_eq!(v.date, make_date(2024, 1, 5));
                assert_eq!(v.prices, vec![10.0, 20.0]);
                assert_eq!(v.basket_value, 80.0);
                assert_eq!(v.daily_return, 0.02);
                assert_eq!(v.nav, 102.0);
            }
            other => panic!("expected valuation, got {other:?}"),
        }
    }

    #[test]
    fn short_row_reads_missing_cells_as_empty() {
        let row = RawRow::from_fields(["2024-01-05"]);
        assert_eq!(row.cell(9), &Cell::Empty);
        match row.classify() {
            Row::Valuation(v) => {
                assert!(v.prices.is_empty());
                assert_eq!(v.nav, 0.0);
            }
            other => panic!("expected valuation, got {other:?}"),
        }
    }

    #[test]
    fn undated_row_is_unparsed() {
        let row = RawRow::from_fields(["Date", "", "Stock1"]);
        assert!(matches!(row.classify(), Row::Unparsed(_)));
    }

    #[test]
    fn to_raw_then_classify_preserves_row() {
        let original = ValuationRow {
            date: make_date(2024, 2, 29),
            prices: vec![1.5, 2.25, 3.0],
            basket_value: 6.75,
            daily_return: -0.0125,
            nav: 98.765,
        };
        let raw = original.to_raw();
        assert_eq!(raw.cells.len(), 10);
        let rendered: Vec<String> = raw.cells.iter().map(Cell::render).collect();
        let reparsed = RawRow::from_fields(rendered.iter().map(String::as_str));
        assert_eq!(reparsed.classify(), Row::Valuation(original));
    }
}

// ═══════════════════════════════════════════════════════════════════
// DateRangeSpec
// ═══════════════════════════════════════════════════════════════════

mod date_range {
    use super::*;

    #[test]
    fn labels_parse_and_display() {
        let labels = ["1 Day", "5 Days", "1 Month", "6 Months", "1 Year", "Max"];
        for (spec, label) in DateRangeSpec::ALL.iter().zip(labels) {
            assert_eq!(spec.to_string(), label);
            assert_eq!(label.parse::<DateRangeSpec>().unwrap(), *spec);
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(matches!(
            "2 Weeks".parse::<DateRangeSpec>(),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&DateRangeSpec::Last6Months).unwrap();
        assert_eq!(json, "\"6 Months\"");
        let back: DateRangeSpec = serde_json::from_str("\"1 Year\"").unwrap();
        assert_eq!(back, DateRangeSpec::Last1Year);
    }

    #[test]
    fn last_day_is_final_row() {
        let rows = daily_rows(make_date(2024, 1, 1), 10);
        let window = DateRangeSpec::LastDay.select(&rows);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].date, make_date(2024, 1, 10));
    }

    #[test]
    fn five_days_counts_rows_not_calendar_days() {
        // Weekly rows: five rows span four weeks.
        let rows: Vec<ValuationRow> = (0..8)
            .map(|i| vrow(make_date(2024, 1, 1) + Duration::weeks(i), 1.0, 100.0))
            .collect();
        let window = DateRangeSpec::Last5Days.select(&rows);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].date, rows[3].date);
        assert_eq!(window[4].date, rows[7].date);
        assert!(window.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn five_days_on_short_ledger_returns_all() {
        let rows = daily_rows(make_date(2024, 1, 1), 3);
        assert_eq!(DateRangeSpec::Last5Days.select(&rows).len(), 3);
    }

    #[test]
    fn one_month_is_thirty_days_inclusive() {
        let rows = daily_rows(make_date(2024, 1, 1), 60);
        let latest = rows.last().unwrap().date;
        let window = DateRangeSpec::Last1Month.select(&rows);
        assert_eq!(window.first().unwrap().date, latest - Duration::days(30));
        assert_eq!(window.len(), 31);
    }

    #[test]
    fn six_months_and_one_year_are_fixed_day_spans() {
        let rows = daily_rows(make_date(2023, 1, 1), 500);
        let latest = rows.last().unwrap().date;
        assert_eq!(
            DateRangeSpec::Last6Months.select(&rows)[0].date,
            latest - Duration::days(180)
        );
        assert_eq!(
            DateRangeSpec::Last1Year.select(&rows)[0].date,
            latest - Duration::days(365)
        );
    }

    #[test]
    fn max_returns_everything() {
        let rows = daily_rows(make_date(2024, 1, 1), 42);
        assert_eq!(DateRangeSpec::Max.select(&rows), rows);
    }

    #[test]
    fn empty_input_gives_empty_window() {
        for spec in DateRangeSpec::ALL {
            assert!(spec.select(&[]).is_empty());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ledger
// ═══════════════════════════════════════════════════════════════════

mod ledger {
    use super::*;

    fn raw(fields: &[&str]) -> RawRow {
        RawRow::from_fields(fields.iter().copied())
    }

    #[test]
    fn load_skips_markers_and_undated_rows() {
        let rows = vec![
            raw(&["2024-01-01", "", "10", "", "", "", "", "10", "0", "100"]),
            raw(&["", "Stocks", "AAA", "BBB"]),
            raw(&["", "Quantities", "1", "2"]),
            raw(&["n/a", "", "1", "2"]),
            raw(&["2024-01-02", "", "10", "20", "", "", "", "50", "0", "100"]),
        ];
        let ledger = Ledger::load(&rows);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.first_row().unwrap().date, make_date(2024, 1, 1));
        assert_eq!(ledger.last_date(), Some(make_date(2024, 1, 2)));
    }

    #[test]
    fn load_keeps_first_of_duplicate_dates_and_sorts() {
        let rows = vec![
            raw(&["2024-01-03", "", "", "", "", "", "", "30", "0", "103"]),
            raw(&["2024-01-01", "", "", "", "", "", "", "10", "0", "101"]),
            raw(&["2024-01-03", "", "", "", "", "", "", "99", "0", "999"]),
        ];
        let ledger = Ledger::load(&rows);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.rows()[0].date, make_date(2024, 1, 1));
        assert_eq!(ledger.get(make_date(2024, 1, 3)).unwrap().nav, 103.0);
    }

    #[test]
    fn append_rejects_duplicate_date() {
        let mut ledger = Ledger::from_rows(daily_rows(make_date(2024, 1, 1), 3));
        let err = ledger
            .append(vrow(make_date(2024, 1, 2), 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDate(d) if d == make_date(2024, 1, 2)));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn append_adds_at_end() {
        let mut ledger = Ledger::from_rows(daily_rows(make_date(2024, 1, 1), 3));
        ledger.append(vrow(make_date(2024, 1, 10), 5.0, 105.0)).unwrap();
        assert_eq!(ledger.last_row().unwrap().nav, 105.0);
        assert!(ledger.contains(make_date(2024, 1, 10)));
    }

    #[test]
    fn append_all_is_all_or_nothing() {
        let mut ledger = Ledger::from_rows(daily_rows(make_date(2024, 1, 1), 3));
        let batch = vec![
            vrow(make_date(2024, 1, 4), 1.0, 1.0),
            vrow(make_date(2024, 1, 3), 1.0, 1.0),
        ];
        assert!(ledger.append_all(&batch).is_err());
        assert_eq!(ledger.len(), 3);

        let repeated = vec![
            vrow(make_date(2024, 1, 5), 1.0, 1.0),
            vrow(make_date(2024, 1, 5), 2.0, 2.0),
        ];
        assert!(ledger.append_all(&repeated).is_err());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn last_nonzero_lookups() {
        let ledger = Ledger::from_rows(vec![
            vrow(make_date(2024, 1, 1), 1000.0, 100.0),
            vrow(make_date(2024, 1, 2), 1010.0, 101.0),
            vrow(make_date(2024, 1, 3), 0.0, 0.0),
        ]);
        assert_eq!(ledger.last_nonzero_basket_value(), Some(1010.0));
        assert_eq!(ledger.last_nonzero_nav(), Some(101.0));
        assert_eq!(Ledger::new().last_nonzero_nav(), None);
    }

    #[test]
    fn filter_is_repeatable() {
        let ledger = Ledger::from_rows(daily_rows(make_date(2024, 1, 1), 20));
        let a = ledger.filter(DateRangeSpec::Last5Days);
        let b = ledger.filter(DateRangeSpec::Last5Days);
        assert_eq!(a, b);
        assert_eq!(ledger.len(), 20);
    }
}

// ═══════════════════════════════════════════════════════════════════
// LedgerSettings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn lookback_is_bounded() {
        let json = format!(r#"{{"lookback_days": {}}}"#, MAX_LOOKBACK_DAYS + 1);
        assert!(matches!(
            LedgerSettings::from_json(&json),
            Err(CoreError::ValidationError(_))
        ));
        let json = format!(r#"{{"lookback_days": {MAX_LOOKBACK_DAYS}}}"#);
        assert!(LedgerSettings::from_json(&json).is_ok());
    }

    #[test]
    fn defaults() {
        let s = LedgerSettings::default();
        assert_eq!(s.lookback_days, 30);
        assert_eq!(s.seed_nav, 100.0);
        assert_eq!(s.default_quantity, 1.0);
        assert_eq!(s.retry, RetryPolicy { max_attempts: 3, delay_ms: 1000 });
        assert!(s.api_keys.is_empty());
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let s = LedgerSettings::from_json(r#"{"lookback_days": 10, "retry": {"delay_ms": 5}}"#)
            .unwrap();
        assert_eq!(s.lookback_days, 10);
        assert_eq!(s.retry.delay_ms, 5);
        assert_eq!(s.retry.max_attempts, 3);
        assert_eq!(s.seed_nav, 100.0);
    }

    #[test]
    fn from_json_rejects_bad_values() {
        assert!(matches!(
            LedgerSettings::from_json(r#"{"seed_nav": 0}"#),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            LedgerSettings::from_json(r#"{"lookback_days": -1}"#),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            LedgerSettings::from_json("not json"),
            Err(CoreError::Deserialization(_))
        ));
    }

    #[test]
    fn retry_always_attempts_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            delay_ms: 0,
        };
        assert_eq!(policy.attempts(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Date cells and price slots
// ═══════════════════════════════════════════════════════════════════

mod dates {
    use super::*;

    #[test]
    fn serial_day_numbers_map_to_dates() {
        assert_eq!(Cell::Number(45296.0).to_date().unwrap(), make_date(2024, 1, 5));
        assert_eq!(Cell::Number(45296.75).to_date().unwrap(), make_date(2024, 1, 5));
        assert!(Cell::Number(-3.0).to_date().is_err());
    }

    #[test]
    fn text_dates_in_several_formats() {
        assert_eq!(Cell::text("2024-01-05").to_date().unwrap(), make_date(2024, 1, 5));
        assert_eq!(
            Cell::text("2024-01-05 00:00:00").to_date().unwrap(),
            make_date(2024, 1, 5)
        );
        assert_eq!(Cell::text("01/05/2024").to_date().unwrap(), make_date(2024, 1, 5));
        assert_eq!(Cell::text("25/12/2024").to_date().unwrap(), make_date(2024, 12, 25));
        assert!(Cell::text("Date").to_date().is_err());
    }

    #[test]
    fn prices_stop_at_first_gap() {
        let row = RawRow::from_fields([
            "2024-01-05", "", "10", "20", "", "40", "", "1000", "0.01", "101",
        ]);
        match row.classify() {
            Row::Valuation(v) => {
                assert_eq!(v.prices, vec![10.0, 20.0]);
                assert_eq!(v.nav, 101.0);
            }
            other => panic!("expected valuation row, got {other:?}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// BasketDefinition
// ═══════════════════════════════════════════════════════════════════

mod basket {
    use super::*;

    #[test]
    fn active_at_is_a_step_function() {
        let defs = vec![
            BasketDefinition::new(make_date(2024, 1, 1), vec![BasketMember::new("AAA", 1.0)]),
            BasketDefinition::new(make_date(2024, 3, 1), vec![BasketMember::new("BBB", 2.0)]),
        ];
        assert!(BasketDefinition::active_at(&defs, make_date(2023, 12, 31)).is_none());
        assert_eq!(
            BasketDefinition::active_at(&defs, make_date(2024, 1, 1)).unwrap().symbols(),
            vec!["AAA"]
        );
        assert_eq!(
            BasketDefinition::active_at(&defs, make_date(2024, 2, 29)).unwrap().symbols(),
            vec!["AAA"]
        );
        assert_eq!(
            BasketDefinition::active_at(&defs, make_date(2024, 3, 1)).unwrap().symbols(),
            vec!["BBB"]
        );
    }

    #[test]
    fn value_of_ignores_missing_slots() {
        let def = BasketDefinition::new(
            make_date(2024, 1, 1),
            vec![BasketMember::new("AAA", 2.0), BasketMember::new("BBB", 3.0)],
        );
        assert_eq!(def.value_of(&[10.0, 20.0]), 80.0);
        assert_eq!(def.value_of(&[10.0]), 20.0);
    }
}
