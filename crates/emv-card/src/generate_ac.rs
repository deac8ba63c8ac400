//! GENERATE AC request and response types

use emv_common::{decode, find_tag, tags};

/// Cryptogram requested in P1 of GENERATE AC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CryptogramType {
    /// Application Authentication Cryptogram (decline)
    Aac = 0x00,
    /// Transaction Certificate (approve offline)
    Tc = 0x40,
    /// Authorisation Request Cryptogram (go online)
    Arqc = 0x80,
}

impl CryptogramType {
    /// Decode the cryptogram type bits of a Cryptogram Information Data byte
    pub fn from_cid(cid: u8) -> Option<Self> {
        match cid & 0xC0 {
            0x00 => Some(Self::Aac),
            0x40 => Some(Self::Tc),
            0x80 => Some(Self::Arqc),
            _ => None,
        }
    }
}

/// GENERATE AC request
#[derive(Debug, Clone)]
pub struct GenerateAcRequest {
    pub cryptogram_type: CryptogramType,
    /// CDOL data built by [`crate::DolBuilder::build`]
    pub cdol_data: Vec<u8>,
}

/// Parsed GENERATE AC response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateAcResponse {
    /// Cryptogram Information Data (9F27)
    pub cid: Option<u8>,
    /// Application Transaction Counter (9F36)
    pub atc: Option<u16>,
    /// Application Cryptogram (9F26)
    pub cryptogram: Option<Vec<u8>>,
    /// Issuer Application Data (9F10)
    pub iad: Option<Vec<u8>>,
    /// Signed Dynamic Application Data (9F4B), present with CDA
    pub sdad: Option<Vec<u8>>,
    pub raw_data: Vec<u8>,
}

impl GenerateAcResponse {
    /// Parse a format 1 (tag 80) or format 2 (tag 77) response
    pub fn parse(data: &[u8]) -> Self {
        let mut response = Self {
            raw_data: data.to_vec(),
            ..Self::default()
        };

        let Some(Ok(template)) = decode(data).next() else {
            return response;
        };

        match template.tag {
            // CID(1) ATC(2) AC(8) IAD(var)
            tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_1 => {
                let value = template.value;
                response.cid = value.first().copied();
                response.atc = value.get(1..3).map(|b| u16::from_be_bytes([b[0], b[1]]));
                response.cryptogram = value.get(3..11).map(<[u8]>::to_vec);
                response.iad = value.get(11..).filter(|b| !b.is_empty()).map(<[u8]>::to_vec);
            }
            tags::RESPONSE_MESSAGE_TEMPLATE_FORMAT_2 => {
                let value = template.value;
                response.cid = find_tag(value, tags::CRYPTOGRAM_INFORMATION_DATA)
                    .and_then(|b| b.first().copied());
                response.atc = find_tag(value, tags::APPLICATION_TRANSACTION_COUNTER)
                    .filter(|b| b.len() == 2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]));
                response.cryptogram =
                    find_tag(value, tags::APPLICATION_CRYPTOGRAM).map(<[u8]>::to_vec);
                response.iad = find_tag(value, tags::ISSUER_APPLICATION_DATA).map(<[u8]>::to_vec);
                response.sdad =
                    find_tag(value, tags::SIGNED_DYNAMIC_APPLICATION_DATA).map(<[u8]>::to_vec);
            }
            _ => {}
        }

        response
    }

    /// Cryptogram type the card actually produced
    pub fn cryptogram_type(&self) -> Option<CryptogramType> {
        self.cid.and_then(CryptogramType::from_cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_format1_response() {
        let data = hex!("80 12 80 0042 1122334455667788 06010A03A00000");
        let response = GenerateAcResponse::parse(&data);

        assert_eq!(response.cid, Some(0x80));
        assert_eq!(response.atc, Some(0x0042));
        assert_eq!(response.cryptogram, Some(hex!("1122334455667788").to_vec()));
        assert_eq!(response.iad, Some(hex!("06010A03A00000").to_vec()));
        assert_eq!(response.cryptogram_type(), Some(CryptogramType::Arqc));
        assert_eq!(response.raw_data, data);
    }

    #[test]
    fn test_format2_response() {
        let data = hex!(
            "77 1E"
            "9F27 01 40"
            "9F36 02 0007"
            "9F26 08 0102030405060708"
            "9F10 07 06010A03600000"
        );
        let response = GenerateAcResponse::parse(&data);

        assert_eq!(response.cid, Some(0x40));
        assert_eq!(response.atc, Some(7));
        assert_eq!(response.cryptogram.as_deref(), Some(&hex!("0102030405060708")[..]));
        assert_eq!(response.iad.as_deref().map(<[u8]>::len), Some(7));
        assert_eq!(response.sdad, None);
        assert_eq!(response.cryptogram_type(), Some(CryptogramType::Tc));
    }

    #[test]
    fn test_unrecognized_response() {
        let response = GenerateAcResponse::parse(&hex!("6F 00"));
        assert_eq!(response.cid, None);
        assert_eq!(response.raw_data, hex!("6F00"));
    }

    #[test]
    fn test_cid_decoding() {
        assert_eq!(CryptogramType::from_cid(0x00), Some(CryptogramType::Aac));
        assert_eq!(CryptogramType::from_cid(0x41), Some(CryptogramType::Tc));
        assert_eq!(CryptogramType::from_cid(0xC0), None);
    }
}
