// Report assembly: weekly sections, monthly pivot and the new-users list.
use crate::annual::{annual_series, AnnualSummary};
use crate::auxdata::{DevEffort, MonthlyStore, SlaMonth, DEV_EFFORTS_FILE, SLA_FILE};
use crate::category::normalize_categories;
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::loader::{load_tickets, LoadReport};
use crate::new_users::{extract_new_users, NewUsersTable};
use crate::pivot::{aggregate_month, PivotTable};
use crate::sections::{partition, PartitionRules};
use crate::types::{Period, SummaryCounts, TicketRecord, Workbook};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub summary: SummaryCounts,
    pub left_section: Vec<TicketRecord>,
    pub right_section: Vec<TicketRecord>,
    pub new_users_section: NewUsersTable,
    pub period: Period,
    #[serde(skip)]
    pub load: LoadReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub total_tickets: usize,
    pub closed_tickets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub summary: MonthlySummary,
    pub pivot_data: PivotTable,
    pub annual_summary: AnnualSummary,
    pub sla_data: SlaMonth,
    /// Effort entries for the report year keyed by month number.
    pub dev_efforts_data: BTreeMap<u32, DevEffort>,
    #[serde(skip)]
    pub load: LoadReport,
}

/// Per-request knobs that override `ReportConfig`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions<'a> {
    pub sheet: Option<&'a str>,
    pub rules: Option<PartitionRules>,
}

/// The SLA and effort stores read from `ReportConfig::data_dir`.
#[derive(Debug, Clone, Default)]
pub struct AuxStores {
    pub sla: MonthlyStore<SlaMonth>,
    pub dev_efforts: MonthlyStore<DevEffort>,
}

impl AuxStores {
    pub fn load(dir: &Path) -> Self {
        AuxStores {
            sla: MonthlyStore::load(&dir.join(SLA_FILE)),
            dev_efforts: MonthlyStore::load(&dir.join(DEV_EFFORTS_FILE)),
        }
    }
}

pub fn validate_range(begin: NaiveDate, end: NaiveDate) -> Result<Period> {
    if begin > end {
        return Err(ReportError::InvalidDateRange {
            begin: begin.to_string(),
            end: end.to_string(),
        });
    }
    Ok(Period { begin, end })
}

pub fn generate_weekly(
    workbook: &Workbook,
    begin: NaiveDate,
    end: NaiveDate,
    config: &ReportConfig,
    opts: &RequestOptions<'_>,
) -> Result<WeeklyReport> {
    let period = validate_range(begin, end)?;
    let (set, load) = load_tickets(workbook, &config.sheet_allow_list(opts.sheet))?;
    let set = normalize_categories(&set);
    let rules = opts.rules.unwrap_or(config.partition_rules);
    let sections = partition(&set, begin, end, rules)?;
    let new_users = extract_new_users(workbook, &config.new_users_sheet, begin, end, config.header_scan_rows);
    info!(
        %rules,
        open = sections.summary.open_count,
        closed = sections.summary.closed_count,
        "weekly report ready"
    );
    Ok(WeeklyReport {
        summary: sections.summary,
        left_section: sections.active,
        right_section: sections.backlog,
        new_users_section: new_users,
        period,
        load,
    })
}

pub fn generate_monthly(
    workbook: &Workbook,
    year: i32,
    month: u32,
    config: &ReportConfig,
    opts: &RequestOptions<'_>,
    aux: &AuxStores,
) -> Result<MonthlyReport> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidMonth(month));
    }
    let (set, load) = load_tickets(workbook, &config.sheet_allow_list(opts.sheet))?;
    let set = normalize_categories(&set);
    let pivot = aggregate_month(&set, year, month)?;
    let annual = annual_series(&set, year, Some(month))?;
    let summary = MonthlySummary {
        total_tickets: pivot.total_tickets,
        closed_tickets: pivot.closed_tickets(),
    };
    info!(
        year,
        month,
        groups = pivot.len(),
        total = summary.total_tickets,
        "monthly report ready"
    );
    Ok(MonthlyReport {
        year,
        month,
        summary,
        pivot_data: pivot,
        annual_summary: annual,
        sla_data: aux.sla.get(year, month).cloned().unwrap_or_default(),
        dev_efforts_data: aux
            .dev_efforts
            .for_year(year)
            .into_iter()
            .map(|(m, e)| (m, e.clone()))
            .collect(),
        load,
    })
}

/// Onboarding rows on their own, flagged against `[begin, end]`.
pub fn generate_new_users(
    workbook: &Workbook,
    begin: NaiveDate,
    end: NaiveDate,
    config: &ReportConfig,
) -> Result<NewUsersTable> {
    validate_range(begin, end)?;
    Ok(extract_new_users(
        workbook,
        &config.new_users_sheet,
        begin,
        end,
        config.header_scan_rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxdata::{DevEffort, SlaBreach};
    use crate::types::{Cell, RawSheet};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn workbook() -> Workbook {
        let header = ["Date Created", "Ticket No.", "Type", "Category", "Status", "Time - Close"];
        let rows: &[[&str; 6]] = &[
            ["2026-01-05", "T1", "Incident", "Reset password", "OPEN", ""],
            ["2026-01-06", "T2", "Service", "Create account", "CLOSE", "2026-01-07"],
            ["2026-01-07", "T3", "Service", "Cancel", "OPEN", ""],
        ];
        let mut all = vec![header.iter().map(|h| Cell::text(h)).collect::<Vec<_>>()];
        all.extend(rows.iter().map(|r| r.iter().map(|v| Cell::text(v)).collect()));
        Workbook::new(vec![RawSheet::new("2026", all)])
    }

    #[test]
    fn reversed_range_rejected_before_loading() {
        let err = validate_range(d("2026-01-10"), d("2026-01-01")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATE_RANGE");
        assert!(validate_range(d("2026-01-10"), d("2026-01-10")).is_ok());
    }

    #[test]
    fn weekly_has_both_sections_and_period() {
        let report = generate_weekly(
            &workbook(),
            d("2026-01-01"),
            d("2026-01-15"),
            &ReportConfig::default(),
            &RequestOptions::default(),
        )
        .unwrap();
        assert_eq!(report.summary.open_count, 1);
        assert_eq!(report.summary.closed_count, 1);
        assert_eq!(report.right_section.len(), 2);
        assert!(report.new_users_section.rows.is_empty());
        assert_eq!(report.period.begin, d("2026-01-01"));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("load").is_none());
        assert_eq!(json["left_section"][0]["type"], "Incident");
    }

    #[test]
    fn weekly_sections_skip_cancelled_tickets() {
        let report = generate_weekly(
            &workbook(),
            d("2026-01-01"),
            d("2026-01-15"),
            &ReportConfig::default(),
            &RequestOptions::default(),
        )
        .unwrap();
        let numbers: Vec<&str> = report
            .left_section
            .iter()
            .chain(&report.right_section)
            .map(|r| r.ticket_no.as_deref().unwrap_or(""))
            .collect();
        assert!(!numbers.contains(&"T3"));
        assert_eq!(report.left_section.len(), 1);
    }

    #[test]
    fn explicit_sheet_is_allowed_alongside_years() {
        let mut wb = workbook();
        wb.sheets[0].name = "Daily".to_string();
        let opts = RequestOptions { sheet: Some("Daily"), rules: None };
        let report = generate_weekly(&wb, d("2026-01-01"), d("2026-01-15"), &ReportConfig::default(), &opts).unwrap();
        assert_eq!(report.load.sheets_ingested, vec!["Daily".to_string()]);
    }

    #[test]
    fn monthly_excludes_cancel_and_attaches_aux_data() {
        let mut aux = AuxStores::default();
        aux.sla.insert(
            2026,
            1,
            SlaMonth {
                breaches: vec![SlaBreach {
                    id: Some(1),
                    ticket_no: "T1".into(),
                    requested_for: String::new(),
                    description: "late".into(),
                    percentage: "130%".into(),
                    elapsed_time: "5d".into(),
                    remarks: String::new(),
                    created_at: None,
                }],
            },
        );
        aux.dev_efforts.insert(2026, 1, DevEffort { me_hours: 10.0, sow_planned: 16.0, carry_forward: 6.0 });
        aux.dev_efforts.insert(2025, 1, DevEffort { me_hours: 3.0, sow_planned: 16.0, carry_forward: 13.0 });

        let report = generate_monthly(
            &workbook(),
            2026,
            1,
            &ReportConfig::default(),
            &RequestOptions::default(),
            &aux,
        )
        .unwrap();
        assert_eq!(report.summary, MonthlySummary { total_tickets: 2, closed_tickets: 1 });
        assert_eq!(report.annual_summary.months, vec![1]);
        assert_eq!(report.annual_summary.total(), 2);
        assert_eq!(report.sla_data.breaches.len(), 1);
        assert_eq!(report.dev_efforts_data.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn monthly_rejects_bad_month_and_empty_month() {
        let cfg = ReportConfig::default();
        let aux = AuxStores::default();
        let opts = RequestOptions::default();
        let err = generate_monthly(&workbook(), 2026, 0, &cfg, &opts, &aux).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_MONTH");
        let err = generate_monthly(&workbook(), 2026, 6, &cfg, &opts, &aux).unwrap_err();
        assert_eq!(err.error_code(), "NO_DATA_FOR_MONTH");
        assert!(err.is_client_error());
    }
}
