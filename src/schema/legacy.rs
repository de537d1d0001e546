//! Minimal ONIX 2.1 schema.
//!
//! The `Text` child of `OtherText` may carry embedded XHTML and is not bound by
//! ordinary decoding. Its content reaches the record through the decoder's
//! side channel and [`LegacySchema::reattach_unbound`].

use super::tags::LEGACY_SHORT_TAGS;
use super::{OnixRecord, Schema};
use crate::dialect::SchemaGeneration;
use serde::{Deserialize, Serialize};

/// ONIX 2.1 message header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "Header")]
pub struct LegacyHeader {
    /// Sending organisation
    #[serde(rename = "FromCompany", skip_serializing_if = "Option::is_none")]
    pub from_company: Option<String>,
    /// Contact person
    #[serde(rename = "FromPerson", skip_serializing_if = "Option::is_none")]
    pub from_person: Option<String>,
    /// Contact email
    #[serde(rename = "FromEmail", skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    /// Addressee
    #[serde(rename = "ToCompany", skip_serializing_if = "Option::is_none")]
    pub to_company: Option<String>,
    /// Send date, as written in the feed
    #[serde(rename = "SentDate", skip_serializing_if = "Option::is_none")]
    pub sent_date: Option<String>,
    /// Free-text note
    #[serde(rename = "MessageNote", skip_serializing_if = "Option::is_none")]
    pub message_note: Option<String>,
    /// Default language of text
    #[serde(rename = "DefaultLanguageOfText", skip_serializing_if = "Option::is_none")]
    pub default_language_of_text: Option<String>,
    /// Price type code applied to prices that do not declare one
    #[serde(rename = "DefaultPriceTypeCode", skip_serializing_if = "Option::is_none")]
    pub default_price_type_code: Option<String>,
    /// Currency applied to prices that do not declare one
    #[serde(rename = "DefaultCurrencyCode", skip_serializing_if = "Option::is_none")]
    pub default_currency_code: Option<String>,
}

/// Composite product identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyProductIdentifier {
    /// Code list 5 identifier type
    #[serde(rename = "ProductIDType")]
    pub id_type: String,
    /// Identifier value
    #[serde(rename = "IDValue")]
    pub id_value: String,
}

/// Title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyTitle {
    /// Code list 15 title type
    #[serde(rename = "TitleType", skip_serializing_if = "Option::is_none")]
    pub title_type: Option<String>,
    /// Title text
    #[serde(rename = "TitleText", skip_serializing_if = "Option::is_none")]
    pub title_text: Option<String>,
    /// Subtitle
    #[serde(rename = "Subtitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Contributor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyContributor {
    /// Position in the contributor list
    #[serde(rename = "SequenceNumber", skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,
    /// Code list 17 roles
    #[serde(rename = "ContributorRole")]
    pub roles: Vec<String>,
    /// Name in display order
    #[serde(rename = "PersonName", skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    /// Name in sort order
    #[serde(rename = "PersonNameInverted", skip_serializing_if = "Option::is_none")]
    pub person_name_inverted: Option<String>,
}

/// Language of the product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyLanguage {
    /// Code list 22 role
    #[serde(rename = "LanguageRole")]
    pub role: String,
    /// ISO 639-2/B code
    #[serde(rename = "LanguageCode")]
    pub code: String,
}

/// Descriptive text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyOtherText {
    /// Code list 33 text type
    #[serde(rename = "TextTypeCode")]
    pub text_type_code: String,
    /// Code list 34 text format
    #[serde(rename = "TextFormat", skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,
    /// Text body; filled positionally after decoding
    #[serde(skip)]
    pub text: Option<String>,
    /// Code list 35 link type
    #[serde(rename = "TextLinkType", skip_serializing_if = "Option::is_none")]
    pub text_link_type: Option<String>,
    /// Link to the text
    #[serde(rename = "TextLink", skip_serializing_if = "Option::is_none")]
    pub text_link: Option<String>,
}

/// Publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyPublisher {
    /// Code list 45 role
    #[serde(rename = "PublishingRole", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Publisher name
    #[serde(rename = "PublisherName")]
    pub name: String,
}

/// Price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyPrice {
    /// Code list 58 price type; backfilled from the header
    #[serde(rename = "PriceTypeCode", skip_serializing_if = "Option::is_none")]
    pub price_type_code: Option<String>,
    /// Amount
    #[serde(rename = "PriceAmount", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// ISO 4217 currency; backfilled from the header
    #[serde(rename = "CurrencyCode", skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// Supply detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySupplyDetail {
    /// Supplier name
    #[serde(rename = "SupplierName", skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    /// Code list 65 availability
    #[serde(rename = "ProductAvailability", skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    /// Prices
    #[serde(rename = "Price")]
    pub prices: Vec<LegacyPrice>,
}

/// ONIX 2.1 product record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "Product")]
pub struct LegacyProduct {
    /// Sender's unique record key
    #[serde(rename = "RecordReference")]
    pub record_reference: String,
    /// Code list 1 notification type
    #[serde(rename = "NotificationType", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    /// Deprecated ISBN-10 element
    #[serde(rename = "ISBN", skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Deprecated EAN-13 element
    #[serde(rename = "EAN13", skip_serializing_if = "Option::is_none")]
    pub ean13: Option<String>,
    /// Composite identifiers
    #[serde(rename = "ProductIdentifier")]
    pub identifiers: Vec<LegacyProductIdentifier>,
    /// Code list 7 form
    #[serde(rename = "ProductForm", skip_serializing_if = "Option::is_none")]
    pub product_form: Option<String>,
    /// Titles
    #[serde(rename = "Title")]
    pub titles: Vec<LegacyTitle>,
    /// Contributors
    #[serde(rename = "Contributor")]
    pub contributors: Vec<LegacyContributor>,
    /// Languages
    #[serde(rename = "Language")]
    pub languages: Vec<LegacyLanguage>,
    /// Descriptive texts
    #[serde(rename = "OtherText")]
    pub other_texts: Vec<LegacyOtherText>,
    /// Publishers
    #[serde(rename = "Publisher")]
    pub publishers: Vec<LegacyPublisher>,
    /// Publication date, as written in the feed
    #[serde(rename = "PublicationDate", skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    /// Supply details
    #[serde(rename = "SupplyDetail")]
    pub supply_details: Vec<LegacySupplyDetail>,
}

impl LegacyProduct {
    /// ISBN-13, from the composite identifiers (type `15`) or the `EAN13` element.
    #[must_use]
    pub fn isbn13(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.id_type == "15")
            .map(|id| id.id_value.as_str())
            .or(self.ean13.as_deref())
    }

    /// Title text of the first title, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.titles.first()?.title_text.as_deref()
    }

    /// All prices across every supply detail.
    pub fn prices(&self) -> impl Iterator<Item = &LegacyPrice> {
        self.supply_details.iter().flat_map(|detail| &detail.prices)
    }
}

/// Whole ONIX 2.1 message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "ONIXMessage")]
pub struct LegacyMessage {
    /// Release attribute (`2.1`)
    #[serde(rename = "@release", skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Header
    #[serde(rename = "Header")]
    pub header: LegacyHeader,
    /// Products in document order
    #[serde(rename = "Product")]
    pub products: Vec<LegacyProduct>,
}

const OTHER_TEXT_BODY: &[(&str, &str)] = &[("OtherText", "Text")];

impl OnixRecord for LegacyHeader {
    const TYPE_NAME: &'static str = "onix2::Header";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        LEGACY_SHORT_TAGS
    }
}

impl OnixRecord for LegacyProduct {
    const TYPE_NAME: &'static str = "onix2::Product";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        LEGACY_SHORT_TAGS
    }

    fn unbound_elements() -> &'static [(&'static str, &'static str)] {
        OTHER_TEXT_BODY
    }
}

impl OnixRecord for LegacyMessage {
    const TYPE_NAME: &'static str = "onix2::Message";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        LEGACY_SHORT_TAGS
    }

    fn unbound_elements() -> &'static [(&'static str, &'static str)] {
        OTHER_TEXT_BODY
    }
}

/// The ONIX 2.1 schema generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySchema;

impl Schema for LegacySchema {
    const GENERATION: SchemaGeneration = SchemaGeneration::Legacy;

    type Header = LegacyHeader;
    type Product = LegacyProduct;
    type Message = LegacyMessage;

    fn split_message(message: LegacyMessage) -> (LegacyHeader, Vec<LegacyProduct>) {
        (message.header, message.products)
    }

    fn apply_header_defaults(product: &mut LegacyProduct, header: &LegacyHeader) {
        for detail in &mut product.supply_details {
            for price in &mut detail.prices {
                if price.price_type_code.is_none() {
                    price.price_type_code.clone_from(&header.default_price_type_code);
                }
                if price.currency_code.is_none() {
                    price.currency_code.clone_from(&header.default_currency_code);
                }
            }
        }
    }

    /// Pairs fragments with `OtherText` slots by index. Surplus fragments or
    /// slots are left untouched.
    fn reattach_unbound(product: &mut LegacyProduct, fragments: &[String]) -> usize {
        let paired = product.other_texts.len().min(fragments.len());
        for (slot, fragment) in product.other_texts.iter_mut().zip(fragments) {
            slot.text = Some(fragment.clone());
        }
        paired
    }
}
