//! Payment application discovery (PSE / PPSE)
//!
//! Contact cards list their applications in the records of the Payment
//! System Environment; contactless cards return them directly in the FCI of
//! the Proximity PSE.

use emv_common::{decode, tags, EmvTag};
use tracing::debug;

/// Known EMV directory and application identifiers
pub mod aids {
    /// PSE (Payment System Environment)
    pub const PSE: &[u8] = b"1PAY.SYS.DDF01";

    /// PPSE (Proximity Payment System Environment)
    pub const PPSE: &[u8] = b"2PAY.SYS.DDF01";

    /// Visa
    pub const VISA: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];

    /// Mastercard
    pub const MASTERCARD: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10];

    /// UnionPay debit
    pub const UNIONPAY_DEBIT: &[u8] = &[0xA0, 0x00, 0x00, 0x03, 0x33, 0x01, 0x01, 0x01];
}

/// Priority assumed when a card sends no tag 87
pub const DEFAULT_PRIORITY: u8 = 99;

/// A payment application advertised by the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmvApplication {
    pub aid: Vec<u8>,
    pub label: String,
    pub preferred_name: Option<String>,
    /// Lower is preferred
    pub priority: u8,
    /// PDOL from the FCI, known once the application has been selected
    pub pdol: Option<Vec<u8>>,
}

impl EmvApplication {
    fn new(aid: Vec<u8>) -> Self {
        Self {
            aid,
            label: String::new(),
            preferred_name: None,
            priority: DEFAULT_PRIORITY,
            pdol: None,
        }
    }

    /// Give unlabeled applications a name derived from the AID
    fn finish(mut self) -> Self {
        if self.label.is_empty() {
            self.label = fallback_label(&self.aid);
        }
        self
    }
}

/// `App_` followed by the last four hex digits of the AID
pub fn fallback_label(aid: &[u8]) -> String {
    let hex = hex::encode_upper(aid);
    format!("App_{}", &hex[hex.len().saturating_sub(4)..])
}

/// Applications found in the current card session, in discovery order
///
/// Each entry is keyed `"{ordinal}. {label}"` so duplicate labels stay
/// selectable.
#[derive(Debug, Clone, Default)]
pub struct ApplicationRegistry {
    entries: Vec<(String, EmvApplication)>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add an application and return its key
    pub fn register(&mut self, app: EmvApplication) -> String {
        let key = format!("{}. {}", self.entries.len() + 1, app.label);
        self.entries.push((key.clone(), app));
        key
    }

    pub fn get(&self, key: &str) -> Option<&EmvApplication> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, app)| app)
    }

    /// Look up by key, or by 1-based ordinal when `selector` is a number
    pub fn select(&self, selector: &str) -> Option<&EmvApplication> {
        self.position(selector).map(|i| &self.entries[i].1)
    }

    /// Mutable counterpart of [`select`](Self::select)
    pub fn select_mut(&mut self, selector: &str) -> Option<&mut EmvApplication> {
        let index = self.position(selector)?;
        self.entries.get_mut(index).map(|(_, app)| app)
    }

    fn position(&self, selector: &str) -> Option<usize> {
        if let Some(index) = self.entries.iter().position(|(k, _)| k == selector) {
            return Some(index);
        }
        let index = selector.trim().parse::<usize>().ok()?.checked_sub(1)?;
        (index < self.entries.len()).then_some(index)
    }

    /// Application with the lowest priority number, earliest first on ties
    pub fn preferred(&self) -> Option<&EmvApplication> {
        self.preferred_entry().map(|(_, app)| app)
    }

    /// Key and application of [`preferred`](Self::preferred)
    pub fn preferred_entry(&self) -> Option<(&str, &EmvApplication)> {
        self.iter().min_by_key(|(_, app)| app.priority)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EmvApplication)> {
        self.entries.iter().map(|(k, app)| (k.as_str(), app))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one PSE directory record into the applications it lists
///
/// Walks tags 61 and 70 recursively. Tag 4F opens a new application; 50,
/// 9F12 and 87 describe the most recent one. A label seen before any AID is
/// ignored.
pub fn parse_pse_record(record: &[u8]) -> Vec<EmvApplication> {
    let mut apps = Vec::new();
    let mut current = None;
    walk_pse(record, &mut current, &mut apps);
    apps.extend(current.map(EmvApplication::finish));
    apps
}

fn walk_pse(data: &[u8], current: &mut Option<EmvApplication>, apps: &mut Vec<EmvApplication>) {
    for item in decode(data) {
        let tlv = match item {
            Ok(tlv) => tlv,
            Err(err) => {
                debug!(error = %err, "malformed PSE record entry");
                return;
            }
        };

        match tlv.tag {
            tags::APPLICATION_TEMPLATE | tags::RECORD_TEMPLATE => walk_pse(tlv.value, current, apps),
            tags::APPLICATION_IDENTIFIER => {
                apps.extend(current.take().map(EmvApplication::finish));
                *current = Some(EmvApplication::new(tlv.value.to_vec()));
            }
            tags::APPLICATION_LABEL => match current.as_mut() {
                Some(app) => app.label = text(tlv.value),
                None => debug!("label without AID ignored"),
            },
            tags::APPLICATION_PREFERRED_NAME => {
                if let Some(app) = current.as_mut() {
                    app.preferred_name = Some(text(tlv.value));
                }
            }
            tags::APPLICATION_PRIORITY_INDICATOR => {
                if let (Some(app), Some(&b)) = (current.as_mut(), tlv.value.first()) {
                    app.priority = b & 0x0F;
                }
            }
            _ => {}
        }
    }
}

/// Parse the FCI returned by SELECT PPSE
///
/// The FCI is scanned for application templates (61). Their children are
/// read as single-byte tag, single-byte length pairs.
pub fn parse_ppse_fci(fci: &[u8]) -> Vec<EmvApplication> {
    let mut apps = Vec::new();
    let mut i = 0;

    while i + 1 < fci.len() {
        if fci[i] as u32 != tags::APPLICATION_TEMPLATE.0 {
            i += 1;
            continue;
        }

        let end = i + 2 + fci[i + 1] as usize;
        let Some(template) = fci.get(i + 2..end) else {
            debug!(offset = i, "application template runs past FCI");
            i += 1;
            continue;
        };

        if let Some(app) = parse_ppse_template(template) {
            apps.push(app);
        }
        i = end;
    }

    apps
}

fn parse_ppse_template(template: &[u8]) -> Option<EmvApplication> {
    let mut aid = None;
    let mut label = String::new();
    let mut priority = DEFAULT_PRIORITY;
    let mut j = 0;

    while j + 1 < template.len() {
        let tag = EmvTag(template[j] as u32);
        let len = template[j + 1] as usize;
        let Some(value) = template.get(j + 2..j + 2 + len) else {
            break;
        };

        match tag {
            tags::APPLICATION_IDENTIFIER => aid = Some(value.to_vec()),
            tags::APPLICATION_LABEL => label = text(value),
            tags::APPLICATION_PRIORITY_INDICATOR => {
                if let Some(&b) = value.first() {
                    priority = b & 0x0F;
                }
            }
            _ => {}
        }
        j += 2 + len;
    }

    let aid = aid.filter(|aid| !aid.is_empty())?;
    let mut app = EmvApplication::new(aid);
    app.label = label;
    app.priority = priority;
    Some(app.finish())
}

fn text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_aids() {
        assert_eq!(aids::VISA.len(), 7);
        assert_eq!(aids::MASTERCARD.len(), 7);
        assert_eq!(aids::PSE, b"1PAY.SYS.DDF01");
        assert_eq!(aids::PPSE, b"2PAY.SYS.DDF01");
    }

    #[test]
    fn test_pse_record() {
        let record = hex!(
            "70 1A 61 18"
            "4F 07 A0000000031010"
            "50 0A 56495341204445424954"
            "87 01 01"
        );
        let apps = parse_pse_record(&record);

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].aid, aids::VISA);
        assert_eq!(apps[0].label, "VISA DEBIT");
        assert_eq!(apps[0].priority, 1);
    }

    #[test]
    fn test_pse_label_without_aid_ignored() {
        let record = hex!("70 0C 50 04 56495341 4F 04 A0000000");
        let apps = parse_pse_record(&record);

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].label, "App_0000");
    }

    #[test]
    fn test_pse_record_with_two_applications() {
        let record = hex!(
            "70 22"
            "61 0F 4F 07 A0000000041010 50 04 4D435244"
            "61 0F 4F 07 A0000000043060 50 04 4D414553"
        );
        let apps = parse_pse_record(&record);

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].label, "MCRD");
        assert_eq!(apps[1].label, "MAES");
        assert_eq!(apps[1].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_ppse_fci() {
        let fci = hex!(
            "6F 2D"
            "84 0E 325041592E5359532E4444463031"
            "A5 1B BF0C 18"
            "61 16 4F 07 A0000000031010 50 08 5649534120435244 87 01 02"
        );
        let apps = parse_ppse_fci(&fci);

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].aid, aids::VISA);
        assert_eq!(apps[0].label, "VISA CRD");
        assert_eq!(apps[0].priority, 2);
    }

    #[test]
    fn test_ppse_empty_label_gets_fallback() {
        let fci = hex!("6F 0D A5 0B BF0C 08 61 06 4F 04 A0000333 50 00");
        let fci = &fci[..fci.len() - 2];
        let apps = parse_ppse_fci(fci);

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].label, "App_0333");
    }

    #[test]
    fn test_ppse_truncated_template() {
        let fci = hex!("6F 08 A5 06 BF0C 03 61 10 4F");
        assert!(parse_ppse_fci(&fci).is_empty());
    }

    #[test]
    fn test_registry_keys_and_selection() {
        let mut registry = ApplicationRegistry::new();
        let mut visa = EmvApplication::new(aids::VISA.to_vec());
        visa.label = "VISA".into();
        visa.priority = 2;
        let mut visa_electron = EmvApplication::new(vec![0xA0, 0, 0, 0, 3, 0x20, 0x10]);
        visa_electron.label = "VISA".into();
        visa_electron.priority = 1;

        assert_eq!(registry.register(visa), "1. VISA");
        assert_eq!(registry.register(visa_electron), "2. VISA");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("1. VISA").unwrap().aid, aids::VISA);
        assert_eq!(registry.select("2").unwrap().priority, 1);
        assert!(registry.select("3").is_none());
        assert!(registry.select("0").is_none());
        assert_eq!(registry.preferred().unwrap().priority, 1);
        assert_eq!(registry.preferred_entry().unwrap().0, "2. VISA");

        registry.select_mut("1").unwrap().pdol = Some(hex!("9F66 04").to_vec());
        assert_eq!(registry.get("1. VISA").unwrap().pdol.as_deref(), Some(&hex!("9F66 04")[..]));
        assert!(registry.select_mut("3").is_none());
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["1. VISA", "2. VISA"]
        );

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fallback_label() {
        assert_eq!(fallback_label(&aids::MASTERCARD), "App_1010");
        assert_eq!(fallback_label(&[0xA0]), "App_A0");
    }
}
