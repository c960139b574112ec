//! Minimal ASN.1 schema over the `der` crate.
//!
//! Key containers only need five node types, so they are modelled as one
//! enum and a single walker encodes or decodes any tree of them. Tag and
//! length framing, canonical INTEGER and NULL checks come from `der`. Every
//! other tag (e.g. the context-specific fields of an `ECPrivateKey`) is kept
//! as an opaque [`Asn1::Other`] node so that parsing never loses data.

use crate::error::{PeerKeyError, Result};
use der::asn1::{AnyRef, IntRef, Null, ObjectIdentifier, OctetStringRef};
use der::{Any, Decode, Encode, Reader, SliceReader, Tag, Tagged};

/// Deepest nesting the decoder accepts.
const MAX_DEPTH: usize = 16;

/// One ASN.1 node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asn1 {
    Sequence(Vec<Asn1>),
    OctetString(Vec<u8>),
    ObjectIdentifier(ObjectIdentifier),
    /// Big-endian two's complement content octets, minimal length
    Integer(Vec<u8>),
    Null,
    /// Any other tag, content kept verbatim
    Other { tag: u8, content: Vec<u8> },
}

impl Asn1 {
    /// An INTEGER node holding a non-negative value.
    pub fn uint(value: u64) -> Result<Self> {
        let any = Any::encode_from(&value).map_err(der_error)?;
        Ok(Asn1::Integer(any.value().to_vec()))
    }

    pub fn octets(bytes: &[u8]) -> Self {
        Asn1::OctetString(bytes.to_vec())
    }

    pub fn oid(oid: ObjectIdentifier) -> Self {
        Asn1::ObjectIdentifier(oid)
    }

    /// Encode this node (and its children) as DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Asn1::Sequence(children) => {
                let mut content = Vec::new();
                for child in children {
                    child.encode_into(&mut content)?;
                }
                append(out, &AnyRef::new(Tag::Sequence, &content).map_err(der_error)?)
            }
            Asn1::OctetString(bytes) => {
                append(out, &OctetStringRef::new(bytes).map_err(der_error)?)
            }
            Asn1::ObjectIdentifier(oid) => append(out, oid),
            Asn1::Integer(content) => {
                append(out, &AnyRef::new(Tag::Integer, content).map_err(der_error)?)
            }
            Asn1::Null => append(out, &Null),
            Asn1::Other { tag, content } => {
                let tag = Tag::try_from(*tag).map_err(der_error)?;
                append(out, &AnyRef::new(tag, content).map_err(der_error)?)
            }
        }
    }

    /// Decode exactly one DER node from `input`; trailing bytes are an error.
    pub fn from_der(input: &[u8]) -> Result<Self> {
        let any = AnyRef::from_der(input).map_err(der_error)?;
        Self::from_any(any, 0)
    }

    fn from_any(any: AnyRef<'_>, depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(malformed("nesting too deep".to_string()));
        }

        let node = match any.tag() {
            Tag::Sequence => {
                let mut reader = SliceReader::new(any.value()).map_err(der_error)?;
                let mut children = Vec::new();
                while !reader.is_finished() {
                    let child: AnyRef<'_> = reader.decode().map_err(der_error)?;
                    children.push(Self::from_any(child, depth + 1)?);
                }
                Asn1::Sequence(children)
            }
            Tag::OctetString => Asn1::OctetString(any.value().to_vec()),
            Tag::ObjectIdentifier => {
                Asn1::ObjectIdentifier(any.decode_as().map_err(der_error)?)
            }
            Tag::Integer => {
                IntRef::try_from(any).map_err(der_error)?;
                Asn1::Integer(any.value().to_vec())
            }
            Tag::Null => {
                Null::try_from(any).map_err(der_error)?;
                Asn1::Null
            }
            other => Asn1::Other {
                tag: other.into(),
                content: any.value().to_vec(),
            },
        };

        Ok(node)
    }

    /// Children of a SEQUENCE.
    pub fn as_sequence(&self) -> Result<&[Asn1]> {
        match self {
            Asn1::Sequence(children) => Ok(children),
            other => Err(unexpected("SEQUENCE", other)),
        }
    }

    pub fn as_octet_string(&self) -> Result<&[u8]> {
        match self {
            Asn1::OctetString(bytes) => Ok(bytes),
            other => Err(unexpected("OCTET STRING", other)),
        }
    }

    pub fn as_oid(&self) -> Result<&ObjectIdentifier> {
        match self {
            Asn1::ObjectIdentifier(oid) => Ok(oid),
            other => Err(unexpected("OBJECT IDENTIFIER", other)),
        }
    }

    /// Value of a non-negative INTEGER that fits in a `u64`.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Asn1::Integer(content) => AnyRef::new(Tag::Integer, content)
                .and_then(|any| any.decode_as::<u64>())
                .map_err(|e| malformed(format!("INTEGER is not a u64: {}", e))),
            other => Err(unexpected("INTEGER", other)),
        }
    }

    fn type_name(&self) -> String {
        match self {
            Asn1::Sequence(_) => "SEQUENCE".to_string(),
            Asn1::OctetString(_) => "OCTET STRING".to_string(),
            Asn1::ObjectIdentifier(_) => "OBJECT IDENTIFIER".to_string(),
            Asn1::Integer(_) => "INTEGER".to_string(),
            Asn1::Null => "NULL".to_string(),
            Asn1::Other { tag, .. } => format!("tag 0x{:02x}", tag),
        }
    }
}

fn append(out: &mut Vec<u8>, value: &impl Encode) -> Result<()> {
    value.encode_to_vec(out).map_err(der_error)?;
    Ok(())
}

fn der_error(e: der::Error) -> PeerKeyError {
    malformed(format!("invalid DER: {}", e))
}

fn malformed(msg: String) -> PeerKeyError {
    PeerKeyError::MalformedContainer(msg)
}

fn unexpected(wanted: &str, found: &Asn1) -> PeerKeyError {
    malformed(format!("expected {}, found {}", wanted, found.type_name()))
}
