//! EMV protocol implementation
//!
//! [`EmvCard`] drives one card session over a [`CardChannel`]: application
//! discovery, application selection, GET PROCESSING OPTIONS, AFL record
//! reading and Track 2 recovery.

use emv_common::{find_tag_recursive, tags, EmvTag};
use tracing::{debug, info};

use crate::afl::{parse_afl, COMMON_RECORDS};
use crate::apdu::{commands, status, ApduResponse};
use crate::card_data::{CardData, MergeReport, Priority};
use crate::channel::{CardChannel, CardMode};
use crate::discovery::{aids, parse_ppse_fci, parse_pse_record, ApplicationRegistry, EmvApplication};
use crate::dol::{CommandKind, DolBuilder};
use crate::error::{Error, Result};
use crate::events::{EmvEvent, EventSink, TracingSink};
use crate::generate_ac::{GenerateAcRequest, GenerateAcResponse};
use crate::track2::fill_missing_from_track2;
use crate::transport;

/// SFI of the PSE directory file
const PSE_SFI: u8 = 1;

/// Raw responses kept from the most recent application read
#[derive(Debug, Clone, Default)]
pub struct ApplicationRecords {
    pub select_response: Option<Vec<u8>>,
    pub gpo_response: Option<Vec<u8>>,
    /// `(sfi, record number, record data)` for every record read successfully
    pub records: Vec<(u8, u8, Vec<u8>)>,
}

/// EMV card interface
pub struct EmvCard<'a, C: CardChannel + ?Sized> {
    channel: &'a mut C,
    sink: Box<dyn EventSink + 'a>,
    terminal: DolBuilder,
    registry: ApplicationRegistry,
    records: ApplicationRecords,
}

impl<'a, C: CardChannel + ?Sized> EmvCard<'a, C> {
    /// Create a new EMV card interface logging events through `tracing`
    pub fn new(channel: &'a mut C) -> Self {
        Self {
            channel,
            sink: Box::new(TracingSink),
            terminal: DolBuilder::new().with_defaults(),
            registry: ApplicationRegistry::new(),
            records: ApplicationRecords::default(),
        }
    }

    /// Send events to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: impl EventSink + 'a) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Use `terminal` to answer PDOL and CDOL requests
    pub fn with_terminal_data(mut self, terminal: DolBuilder) -> Self {
        self.terminal = terminal;
        self
    }

    pub fn terminal_data(&self) -> &DolBuilder {
        &self.terminal
    }

    /// Contact or contactless, judged from the ATR
    pub fn card_mode(&self) -> Result<CardMode> {
        Ok(CardMode::from_atr(&self.channel.atr()?))
    }

    /// Exchange one command with status word correction
    pub fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse> {
        Ok(transport::exchange(
            &mut *self.channel,
            command,
            &mut *self.sink,
        )?)
    }

    /// SELECT by DF name or AID
    pub fn select(&mut self, name: &[u8]) -> Result<ApduResponse> {
        self.transmit(&commands::select(name).build())
    }

    pub fn read_record(&mut self, sfi: u8, record: u8) -> Result<ApduResponse> {
        self.transmit(&commands::read_record(record, sfi).build())
    }

    /// Enumerate applications from the contact PSE
    ///
    /// Returns the number of applications registered. A failed SELECT
    /// yields zero; a failed record read ends the scan early.
    pub fn load_pse_applications(&mut self) -> Result<usize> {
        self.registry.clear();

        let response = self.select(aids::PSE)?;
        if !response.is_success() {
            self.report_error(format!("SELECT PSE failed: {}", response.status_string()));
            return Ok(0);
        }

        for record in 1..=u8::MAX {
            let response = self.read_record(PSE_SFI, record)?;
            match response.status_word() {
                status::SUCCESS => {
                    for app in parse_pse_record(&response.data) {
                        self.register(app);
                    }
                }
                status::RECORD_NOT_FOUND => {
                    debug!(record, "end of PSE directory");
                    break;
                }
                sw => {
                    self.report_error(format!(
                        "READ RECORD {record} of PSE failed: {sw:04X} ({})",
                        status::describe(sw)
                    ));
                    break;
                }
            }
        }

        info!(count = self.registry.len(), "PSE applications loaded");
        Ok(self.registry.len())
    }

    /// Enumerate applications from the contactless PPSE
    pub fn load_ppse_applications(&mut self) -> Result<usize> {
        self.registry.clear();

        let response = self.select(aids::PPSE)?;
        if !response.is_success() {
            self.report_error(format!("SELECT PPSE failed: {}", response.status_string()));
            return Ok(0);
        }

        for app in parse_ppse_fci(&response.data) {
            self.register(app);
        }

        info!(count = self.registry.len(), "PPSE applications loaded");
        Ok(self.registry.len())
    }

    /// Discover applications through the directory matching `mode`, falling
    /// back to the other directory when the first lists nothing
    pub fn discover(&mut self, mode: CardMode) -> Result<usize> {
        let found = match mode {
            CardMode::Contact => self.load_pse_applications()?,
            CardMode::Contactless => self.load_ppse_applications()?,
        };
        if found > 0 {
            return Ok(found);
        }

        match mode {
            CardMode::Contact => self.load_ppse_applications(),
            CardMode::Contactless => self.load_pse_applications(),
        }
    }

    fn register(&mut self, app: EmvApplication) {
        let aid = hex::encode_upper(&app.aid);
        let key = self.registry.register(app);
        self.message(format!("Found application {key} (AID {aid})"));
    }

    pub fn applications(&self) -> &ApplicationRegistry {
        &self.registry
    }

    /// Read the application registered under `key` (or its ordinal)
    pub fn read_application(&mut self, key: &str) -> Result<CardData> {
        let app = self
            .registry
            .select(key)
            .cloned()
            .ok_or_else(|| Error::UnknownApplication(key.to_string()))?;
        self.read(&app.aid, Some(app.label), Some(key))
    }

    /// Read the registered application with the best priority
    pub fn read_preferred(&mut self) -> Result<CardData> {
        let (key, app) = self
            .registry
            .preferred_entry()
            .map(|(key, app)| (key.to_string(), app.clone()))
            .ok_or(Error::MissingData("payment application"))?;
        self.read(&app.aid, Some(app.label), Some(&key))
    }

    /// Read an application by AID without prior discovery
    pub fn read_aid(&mut self, aid: &[u8]) -> Result<CardData> {
        self.read(aid, None, None)
    }

    /// `key` names the registry entry being read, which records the PDOL
    fn read(&mut self, aid: &[u8], label: Option<String>, key: Option<&str>) -> Result<CardData> {
        self.records = ApplicationRecords::default();
        let mut card = CardData {
            aid: Some(aid.to_vec()),
            application_label: label,
            ..CardData::default()
        };

        self.message(format!("Selecting AID {}", hex::encode_upper(aid)));
        let select = self.select(aid)?;
        if !select.is_success() {
            let status = select.status_word();
            self.report_error(format!("SELECT AID failed: {status:04X}"));
            return Err(Error::Status {
                command: "SELECT",
                status,
            });
        }

        if card.application_label.is_none() {
            card.application_label = find_tag_recursive(&select.data, tags::APPLICATION_LABEL)
                .map(|label| String::from_utf8_lossy(label).trim().to_string());
        }
        let pdol = find_tag_recursive(&select.data, tags::PDOL).map(<[u8]>::to_vec);
        if let Some(app) = key.and_then(|key| self.registry.select_mut(key)) {
            app.pdol = pdol.clone();
        }
        self.records.select_response = Some(select.data);

        let mut entries = Vec::new();
        match self.get_processing_options(pdol.as_deref()) {
            Ok(gpo) => {
                let report = card.merge_tlv(&gpo, Priority::Low);
                self.report_merge(report, Priority::Low);
                entries = parse_afl(&gpo);
                self.records.gpo_response = Some(gpo);
            }
            Err(Error::Channel(err)) => return Err(Error::Channel(err)),
            Err(err) => self.report_error(format!("GET PROCESSING OPTIONS failed: {err}")),
        }

        if entries.is_empty() {
            self.message("No AFL available, probing common records".to_string());
            for (sfi, record) in COMMON_RECORDS {
                self.read_into(sfi, record, &mut card)?;
            }
        } else {
            for entry in entries {
                debug!(sfi = entry.sfi, first = entry.first_record, last = entry.last_record, "reading AFL entry");
                for record in entry.records() {
                    if !self.read_into(entry.sfi, record, &mut card)? {
                        self.report_error(format!("READ RECORD SFI {} record {record} failed", entry.sfi));
                    }
                }
            }
        }

        if !fill_missing_from_track2(&mut card) {
            self.report_error("PAN not found in records or Track 2".to_string());
        }

        self.sink.emit(EmvEvent::CardDataExtracted(card.clone()));
        Ok(card)
    }

    /// Send GET PROCESSING OPTIONS built from `pdol`
    ///
    /// Returns the response data when the card answered 9000 with a format 1
    /// or format 2 template.
    pub fn get_processing_options(&mut self, pdol: Option<&[u8]>) -> Result<Vec<u8>> {
        let command = self
            .terminal
            .build_command(pdol, CommandKind::GetProcessingOptions)?;
        let response = self.transmit(&command)?;

        if !response.is_success() {
            return Err(Error::Status {
                command: "GET PROCESSING OPTIONS",
                status: response.status_word(),
            });
        }
        match response.data.first() {
            Some(0x80) | Some(0x77) => Ok(response.data),
            _ => Err(Error::MissingData("GPO response template")),
        }
    }

    fn read_into(&mut self, sfi: u8, record: u8, card: &mut CardData) -> Result<bool> {
        let response = self.read_record(sfi, record)?;
        if !response.is_success() {
            debug!(sfi, record, status = %response.status_string(), "record not readable");
            return Ok(false);
        }

        let report = card.merge_tlv(&response.data, Priority::High);
        self.report_merge(report, Priority::High);
        self.records.records.push((sfi, record, response.data));
        Ok(true)
    }

    fn report_merge(&mut self, report: MergeReport, priority: Priority) {
        for field in report.updated {
            self.message(format!("{field} found"));
        }
        for err in report.errors {
            // AFL bytes trailing a format 1 template are not TLV
            if priority == Priority::Low {
                debug!(error = %err, "GPO response not fully decodable");
            } else {
                self.report_error(format!("malformed record data: {err}"));
            }
        }
    }

    /// Locate CDOL1, or CDOL2 failing that, in the records of the last read
    pub fn find_cdol(&self) -> Option<(EmvTag, &[u8])> {
        [tags::CDOL1, tags::CDOL2].into_iter().find_map(|tag| {
            self.records
                .records
                .iter()
                .find_map(|(_, _, data)| find_tag_recursive(data, tag))
                .map(|cdol| (tag, cdol))
        })
    }

    /// Send GENERATE AC for the currently selected application
    ///
    /// This increments the card's Application Transaction Counter.
    pub fn generate_ac(&mut self, request: &GenerateAcRequest) -> Result<GenerateAcResponse> {
        if request.cdol_data.len() > 255 {
            return Err(Error::CommandTooLong(request.cdol_data.len()));
        }
        let command =
            commands::generate_ac(request.cryptogram_type as u8, request.cdol_data.clone()).build();
        let response = self.transmit(&command)?;

        if !response.is_success() {
            return Err(Error::Status {
                command: "GENERATE AC",
                status: response.status_word(),
            });
        }
        Ok(GenerateAcResponse::parse(&response.data))
    }

    /// Raw responses from the most recent read
    pub fn records(&self) -> &ApplicationRecords {
        &self.records
    }

    /// Forget the registry and last read, as on disconnect
    pub fn clear(&mut self) {
        self.registry.clear();
        self.records = ApplicationRecords::default();
    }

    fn message(&mut self, text: String) {
        self.sink.emit(EmvEvent::Message(text));
    }

    fn report_error(&mut self, text: String) {
        self.sink.emit(EmvEvent::Error(text));
    }
}
