// MIT License - Copyright (c) 2021 TJForc
// Event log decoding: raw 5-code tuples to readable records

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::constants::EVENT_DATE_FORMAT;
use crate::devices::inventory::WIRED_CENTRAL_NUMBER;
use crate::devices::{active_zones, DeviceInventory};
use crate::locale::Locale;
pub use crate::protocol::RawEvent;

const WIRED_CENTRAL: &str = "logbook.logMessages.wiredCentral";

/// Which text wins when an event has both an "appear" and a "disappear"
/// message.
///
/// The vendor's own client always shows the "appear" text, whatever the
/// event's last code says, and overwrites that code with `1` as it goes.
/// `AlwaysAppear` does the same: the overwritten code is what later rules
/// read and what `origin_code` reports. `FromFlag` picks by the code
/// instead (`1` = appear), leaves it untouched, and hides the events that
/// only have an "appear" form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppearFlag {
    #[default]
    AlwaysAppear,
    FromFlag,
}

/// One readable event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    pub date: String,
    pub title: String,
    pub details: String,
    pub device: String,
    /// Armed groups involved, 1-based
    pub groups: Vec<u8>,
    /// The raw codes the record was decoded from
    pub origin_code: [i64; 5],
}

/// Texts every event starts from before its rule applies.
#[derive(Debug)]
struct Defaults {
    details: String,
    device: String,
}

/// What a rule changes on top of the defaults.
#[derive(Debug, Default)]
struct Outcome {
    title: Option<String>,
    details: Option<String>,
    device: Option<String>,
    groups: Option<Vec<u8>>,
    hide: bool,
}

impl Outcome {
    fn hidden() -> Self {
        Self {
            hide: true,
            ..Self::default()
        }
    }

    fn device(device: String) -> Self {
        Self {
            device: Some(device),
            ..Self::default()
        }
    }

    fn details(details: String) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }
}

type Rule = fn(&EventTranslator<'_>, &[i64; 5], &Defaults) -> Outcome;

/// Decoding rule of an event code, if it has one. Codes without a rule keep
/// the default texts.
fn rule(code: i64) -> Option<Rule> {
    let rule: Rule = match code {
        1 => alarm,
        5 => product_defect,
        7 | 45 => named_device,
        8 | 21 | 32 => toggled_device,
        10 => known_product,
        18 => tamper,
        23 => appear_only_device,
        24 => arming_access,
        25 => sensor_only,
        27 => central_device,
        34 => appear_only,
        35 => battery_family,
        36 => received_command,
        37 => detection_envelope,
        38 => code_change,
        39 => time_change,
        40 => date_change,
        42 | 47 => device_issue,
        43 => call,
        49 => modification,
        51 => firmware,
        52 => call_counters,
        54 => sim_defect,
        56 => camera_device,
        57 => camera,
        58 => device_type,
        _ => return None,
    };
    Some(rule)
}

/// Codes whose rule always takes its "appear" branch, overwriting the flag.
fn forces_appear(code: i64) -> bool {
    matches!(code, 5 | 8 | 21 | 23 | 32 | 34)
}

/// Whether `code` has a dedicated decoding rule.
pub fn has_rule(code: i64) -> bool {
    rule(code).is_some()
}

/// Keep the events dated within `[start, end]`, both bounds included.
///
/// Dates are normalized to `YYYY-MM-DD HH:MM:SS` and compared as strings.
/// An event date that cannot be parsed is compared as-is.
pub fn filter_by_date(events: Vec<RawEvent>, start: &str, end: &str) -> Vec<RawEvent> {
    events
        .into_iter()
        .filter(|event| {
            let date = normalize_date(&event.date);
            date.as_str() >= start && date.as_str() <= end
        })
        .collect()
}

/// Wall-clock date of an event in the comparison format.
pub fn normalize_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_local().format(EVENT_DATE_FORMAT).to_string();
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return dt.naive_local().format(EVENT_DATE_FORMAT).to_string();
    }
    for format in [EVENT_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return dt.format(EVENT_DATE_FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Turns raw events into readable records, using the installation's device
/// inventory for names and a locale for every text.
pub struct EventTranslator<'a> {
    inventory: &'a DeviceInventory,
    locale: &'a dyn Locale,
    appear: AppearFlag,
}

impl<'a> EventTranslator<'a> {
    pub fn new(inventory: &'a DeviceInventory, locale: &'a dyn Locale) -> Self {
        Self {
            inventory,
            locale,
            appear: AppearFlag::default(),
        }
    }

    pub fn with_appear_flag(mut self, appear: AppearFlag) -> Self {
        self.appear = appear;
        self
    }

    /// Decode every event, dropping hidden ones. Order is preserved.
    pub fn translate_all(&self, events: &[RawEvent]) -> Vec<DecodedEvent> {
        events.iter().filter_map(|e| self.translate(e)).collect()
    }

    /// Decode one event; `None` when its rule hides it.
    pub fn translate(&self, event: &RawEvent) -> Option<DecodedEvent> {
        let mut codes = event.codes;
        let c = &event.codes;
        let title = self.t(&format!("logbook.logEvent.{}", c[0]));
        let appear = self.t(&format!("logbook.logMessagesEvent{}.appear", c[0]));
        let disappear = self.t(&format!("logbook.logMessagesEvent{}.disappear", c[0]));
        let device = self.product(c[1], c[2]);
        let toggles = !appear.is_empty() && !disappear.is_empty();
        let details = if toggles {
            let text = if self.appears(c[4]) { appear } else { disappear };
            text.replace("{0}", &device)
        } else {
            String::new()
        };
        let defaults = Defaults { details, device };

        if self.appear == AppearFlag::AlwaysAppear && (toggles || forces_appear(c[0])) {
            codes[4] = 1;
        }

        let outcome = match rule(c[0]) {
            Some(rule) => rule(self, &codes, &defaults),
            None => Outcome::default(),
        };
        if outcome.hide {
            return None;
        }

        Some(DecodedEvent {
            date: event.date.clone(),
            title: outcome.title.unwrap_or(title),
            details: outcome.details.unwrap_or(defaults.details),
            device: outcome.device.unwrap_or(defaults.device),
            groups: outcome.groups.unwrap_or_default(),
            origin_code: codes,
        })
    }

    fn t(&self, key: &str) -> String {
        self.locale.translate(key, None).unwrap_or_default()
    }

    fn t_sub(&self, key: &str, sub_key: &str) -> String {
        self.locale.translate(key, Some(sub_key)).unwrap_or_default()
    }

    fn product(&self, family_id: i64, number: i64) -> String {
        self.inventory.product_name(self.locale, family_id, number)
    }

    fn appears(&self, flag: i64) -> bool {
        match self.appear {
            AppearFlag::AlwaysAppear => true,
            AppearFlag::FromFlag => flag == 1,
        }
    }

    /// Appear or disappear message of `code`, chosen per the appear flag.
    fn toggled(&self, code: i64, flag: i64) -> String {
        let form = if self.appears(flag) { "appear" } else { "disappear" };
        self.t(&format!("logbook.logMessagesEvent{code}.{form}"))
    }

    fn local_or_distant(&self, flags: i64) -> String {
        if flags & 0x01 == 0 {
            self.t("logbook.logMessages.local")
        } else {
            self.t("logbook.logMessages.distant")
        }
    }

    /// Who changed the clock, followed by where from unless it was an
    /// Internet sync.
    fn operator(&self, who: i64, flags: i64) -> String {
        let label = match (who & 0xFE) >> 1 {
            0 => self.t("logbook.logMessages.user"),
            1 => self.t("logbook.logMessages.installer"),
            2 => self.t("logbook.logMessages.remoteUser"),
            60 => return self.t("logbook.logMessages.internetSync"),
            _ => String::new(),
        };
        format!("{} {}", label, self.local_or_distant(flags))
    }
}

fn alarm(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let device = if c[2] == WIRED_CENTRAL_NUMBER {
        Some(tr.t(WIRED_CENTRAL))
    } else if c[2] > 0 {
        Some(tr.product(2, c[2]))
    } else {
        None
    };
    Outcome {
        device,
        groups: Some(active_zones(c[3])),
        ..Outcome::default()
    }
}

fn product_defect(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    const FAMILIES: [i64; 13] = [1, 6, 2, 3, 4, 5, 7, 9, 17, 19, 20, 21, 22];
    if !FAMILIES.contains(&c[1]) {
        return Outcome::hidden();
    }
    toggled_device(tr, c, d)
}

fn named_device(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    Outcome::device(tr.product(c[1], c[2]))
}

fn toggled_device(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let device = tr.product(c[1], c[2]);
    Outcome {
        details: Some(tr.toggled(c[0], c[4]).replace("{0}", &device)),
        device: Some(device),
        ..Outcome::default()
    }
}

fn known_product(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if tr.t(&format!("logbook.logProduct.{}", c[1])).is_empty() {
        return Outcome::hidden();
    }
    Outcome::device(tr.product(c[1], c[2]))
}

fn tamper(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let mut outcome = if c[2] == 8 {
        Outcome::details(tr.t(WIRED_CENTRAL))
    } else {
        Outcome::device(tr.product(c[1], c[2]))
    };
    outcome.groups = Some(active_zones(c[3]));
    outcome
}

fn appear_only_device(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if !tr.appears(c[4]) {
        return Outcome::hidden();
    }
    let device = tr.product(c[1], c[2]);
    let appear = tr.t(&format!("logbook.logMessagesEvent{}.appear", c[0]));
    Outcome {
        details: Some(appear.replace("{0}", &device)),
        device: Some(device),
        ..Outcome::default()
    }
}

fn arming_access(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let access = (c[3] & 0xFE) >> 1;
    let mut details = if c[4] == 1 {
        tr.t("logbook.logMessagesEvent24.deactivate")
    } else {
        tr.t("logbook.logMessagesEvent24.activate")
    };
    // Literal suffix the vendor client appends for "no code" arming
    if access == 60 {
        details.push_str("NoCode");
    }
    let details = details
        .replace("{0}", &tr.product(c[1], c[2]))
        .replace("{1}", &tr.local_or_distant(c[3]))
        .replace("{2}", &tr.t(&format!("logbook.logAccessCode.{access}")));
    Outcome::details(details)
}

fn sensor_only(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if c[1] != 2 {
        return Outcome::hidden();
    }
    Outcome::device(tr.product(c[1], c[2]))
}

/// Never hidden: the vendor client's hide flag here is misspelt and has no
/// effect.
fn central_device(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if [1, 6, 5, 7, 21, 22].contains(&c[1]) {
        Outcome::device(tr.product(c[1], c[2]))
    } else {
        Outcome::default()
    }
}

fn appear_only(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    if !tr.appears(c[4]) {
        return Outcome::hidden();
    }
    let appear = tr.t(&format!("logbook.logMessagesEvent{}.appear", c[0]));
    Outcome::details(appear.replace("{0}", &d.device))
}

fn battery_family(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    if ![2, 4, 17].contains(&c[1]) {
        return Outcome::hidden();
    }
    let appear = tr.t(&format!("logbook.logMessagesEvent{}.appear", c[0]));
    Outcome::details(appear.replace("{0}", &d.device))
}

fn received_command(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let command = c[1] & 0x0F;
    let final_state = c[1] >> 4;
    let access = c[3] >> 1;
    let title_key = format!("logbook.logEvent.{}", c[0]);

    let (title, show_groups) = if command == 2 {
        (tr.t_sub(&title_key, "label1"), false)
    } else {
        (tr.t_sub(&title_key, "label2"), final_state != 4)
    };

    let mut details = format!(
        "{}{} / {}{}",
        tr.t("logbook.logMessages.receivedCommand"),
        tr.t(&format!("logbook.logReceivedCommand.{command}")),
        tr.t("logbook.logMessages.finalState"),
        tr.t(&format!("logbook.logReceivedCommand.{final_state}")),
    );

    let method = match access {
        4..=35 => tr.t("logbook.logAccessCode.serviceCode").replace("{0}", &(access - 3).to_string()),
        36..=59 => tr.t("logbook.logAccessCode.badge").replace("{0}", &(access - 35).to_string()),
        64..=71 => tr.t("logbook.logAccessCode.badge").replace("{0}", &(access - 63).to_string()),
        0 | 1 | 2 | 61 | 63 => tr.t(&format!("logbook.logAccessCode.{access}")),
        _ => String::new(),
    };
    if !method.is_empty() {
        details.push_str(" / ");
        details.push_str(&method);
    }

    let device = match c[4] {
        1..=15 => tr.product(3, c[4]),
        101..=102 => tr.product(5, c[4] - 100),
        other => tr.t(&format!("logbook.logDevice.{other}")),
    };

    Outcome {
        title: Some(title),
        details: Some(details),
        device: Some(device),
        groups: show_groups.then(|| active_zones(c[2])),
        hide: false,
    }
}

fn detection_envelope(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    let mut outcome = Outcome::default();
    let mut details = if c[2] == WIRED_CENTRAL_NUMBER {
        tr.t(WIRED_CENTRAL)
    } else {
        if c[2] > 0 {
            outcome.device = Some(tr.product(c[1], c[2]));
        }
        d.details.clone()
    };
    if c[4] == 0 {
        details.push_str(&tr.t("logbook.logMessages.disappear"));
    } else {
        details.push_str(&tr.t("logbook.logMessages.appear"));
    }
    if !(1..=4).contains(&c[3]) {
        return Outcome::hidden();
    }
    details.push(' ');
    details.push_str(&tr.t(&format!("logbook.logDetectEnvelop.{}", c[3])));
    outcome.details = Some(details);
    outcome
}

fn code_change(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if !(0..=2).contains(&c[1]) {
        return Outcome::hidden();
    }
    // "acccess" is the key as shipped in the locale files
    let mut details = tr.t(&format!("logbook.logCodeChange.acccess.{}", c[1]));
    match c[3] {
        0..=2 => details.push_str(&tr.t(&format!("logbook.logCodeChange.codeChanged.{}", c[3]))),
        33 if c[4] < 33 => details.push_str(
            &tr.t("logbook.logCodeChange.codeChanged.33")
                .replace("{0}", &c[4].to_string()),
        ),
        _ => return Outcome::hidden(),
    }
    Outcome::details(details)
}

fn time_change(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    Outcome::details(format!(
        "{}{:02}:{:02} / {}",
        tr.t("logbook.logMessages.newTime"),
        c[1],
        c[2],
        tr.operator(c[4], c[3]),
    ))
}

/// Codes carry year - 2000, month, day. An impossible date hides the event.
fn date_change(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let date = c[1]
        .checked_add(2000)
        .and_then(|year| i32::try_from(year).ok())
        .and_then(|year| {
            NaiveDate::from_ymd_opt(year, u32::try_from(c[2]).ok()?, u32::try_from(c[3]).ok()?)
        });
    let Some(date) = date else {
        return Outcome::hidden();
    };
    // No separator before the operator, unlike the time change message
    Outcome::details(format!(
        "{}{}{}",
        tr.t("logbook.logMessages.newDate"),
        date.format("%d/%m/%Y"),
        tr.operator(c[4], c[3]),
    ))
}

fn device_issue(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if !(1..=7).contains(&c[3]) {
        return Outcome::hidden();
    }
    let device = tr.product(c[1], c[2]);
    let details = tr
        .t(&format!("logbook.logMessagesEvent{}", c[0]))
        .replace("{0}", &device)
        .replace("{1}", &tr.t(&format!("logbook.logIssues.{}", c[3])));
    Outcome {
        details: Some(details),
        device: Some(device),
        ..Outcome::default()
    }
}

/// Protocol and media keys reproduce the vendor client's logical-and: the
/// protocol key is `1` or empty, the media key always `0`.
fn call(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let outcome = if c[4] == 0 { "success" } else { "fail" };
    let protocol = if c[2] != 0 { "1" } else { "" };
    let details = format!(
        "{} {} {}{} {}{}{}{}",
        tr.t("logbook.logMessages.callednumber").replace("{0}", &c[1].to_string()),
        tr.t("logbook.logMessages.callType"),
        tr.t("logbook.logMessages.callProtocol"),
        tr.t(&format!("logbook.logCallProtocol.{protocol}")),
        tr.t("logbook.logMessages.callMedia"),
        tr.t("logbook.logCallMedia.0"),
        tr.t("logbook.logMessages.callResult"),
        tr.t(&format!("logbook.logCallResult.{}", c[4])),
    );
    Outcome {
        title: Some(tr.t(&format!("logbook.logEvent.{}.{}", c[0], outcome))),
        details: Some(details),
        ..Outcome::default()
    }
}

fn modification(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if ![1, 3, 5, 6].contains(&c[1]) {
        return Outcome::hidden();
    }
    let kind = c[3] >> 4;
    let mut details = tr.t(&format!("logbook.logModificationType.{kind}"));
    if (0..3).contains(&kind) {
        let access = tr.t(&format!("logbook.logChangedAccess.{}", c[3] & 0x0F));
        if !access.is_empty() {
            details.push(' ');
            details.push_str(&access.replace("{0}", &c[4].to_string()));
        }
    }
    Outcome {
        details: Some(details),
        device: Some(tr.product(c[1], c[2])),
        ..Outcome::default()
    }
}

fn firmware(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let device = tr.product(c[1], c[2]);
    let version = if c[4] == 24 {
        c[1].to_string()
    } else {
        format!("{}.{}.{}", c[1], c[2], c[3])
    };
    let details = tr
        .t("logbook.logMessagesEvent51")
        .replace("{0}", &device)
        .replace("{1}", &version);
    Outcome {
        details: Some(details),
        device: Some(device),
        ..Outcome::default()
    }
}

fn call_counters(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    let cycle = (c[1] << 8) | c[2];
    let acknowledged = (c[3] << 8) | c[4];
    Outcome::details(format!(
        "{}{}",
        tr.t("logbook.logMessages.cycleCalls").replace("{0}", &cycle.to_string()),
        tr.t("logbook.logMessages.acqCalls").replace("{0}", &acknowledged.to_string()),
    ))
}

fn sim_defect(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    if !(0..=2).contains(&c[4]) {
        return Outcome::hidden();
    }
    Outcome::details(tr.t(&format!("logbook.logSimDefect.{}", c[4])))
}

/// Appear or "desappear" (sic) message of a camera event, naming `device`.
fn camera_message(tr: &EventTranslator<'_>, c: &[i64; 5], device: &str) -> String {
    let form = if c[4] == 1 { "appear" } else { "desappear" };
    tr.t(&format!("logbook.logMessagesEvent{}.{}", c[0], form))
        .replace("{0}", device)
}

// Codes 56, 57 and 58 share one decoding: each one runs its own step and
// then every later step.

fn camera_device(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    let device = tr.product(c[1], c[2]);
    let mut outcome = Outcome {
        details: Some(camera_message(tr, c, &device)),
        device: Some(device),
        ..Outcome::default()
    };
    let rest = camera(tr, c, d);
    outcome.hide = rest.hide;
    outcome.title = rest.title;
    outcome.device = rest.device.or(outcome.device);
    outcome.details = rest.details.or(outcome.details);
    outcome
}

fn camera(tr: &EventTranslator<'_>, c: &[i64; 5], d: &Defaults) -> Outcome {
    let mut outcome = device_type(tr, c, d);
    if (0..=32).contains(&c[1]) {
        let device = tr.product(-1, c[2]);
        outcome.details = Some(camera_message(tr, c, &device));
        outcome.device = Some(device);
    } else {
        outcome.hide = true;
    }
    outcome
}

fn device_type(tr: &EventTranslator<'_>, c: &[i64; 5], _: &Defaults) -> Outcome {
    Outcome {
        title: Some(tr.t_sub(
            &format!("logbook.logEvent.{}", c[0]),
            &format!("deviceType{}", c[1]),
        )),
        ..Outcome::default()
    }
}
