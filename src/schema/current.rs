//! Minimal ONIX 3.0 schema.
//!
//! Covers the header and the product blocks the ingestion engine needs to
//! exercise defaults and decoding; fields outside this subset are skipped on
//! decode.

use super::tags::CURRENT_SHORT_TAGS;
use super::{OnixRecord, Schema};
use crate::dialect::SchemaGeneration;
use serde::{Deserialize, Serialize};

/// Message sender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sender {
    /// Sending organisation
    #[serde(rename = "SenderName", skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Contact person
    #[serde(rename = "ContactName", skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    /// Contact email
    #[serde(rename = "EmailAddress", skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// ONIX 3.0 message header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "Header")]
pub struct Header {
    /// Sender block
    #[serde(rename = "Sender", skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    /// Send timestamp, as written in the feed
    #[serde(rename = "SentDateTime", skip_serializing_if = "Option::is_none")]
    pub sent_date_time: Option<String>,
    /// Free-text note
    #[serde(rename = "MessageNote", skip_serializing_if = "Option::is_none")]
    pub message_note: Option<String>,
    /// Language applied to text content that does not declare one
    #[serde(rename = "DefaultLanguageOfText", skip_serializing_if = "Option::is_none")]
    pub default_language_of_text: Option<String>,
    /// Price type applied to prices that do not declare one
    #[serde(rename = "DefaultPriceType", skip_serializing_if = "Option::is_none")]
    pub default_price_type: Option<String>,
    /// Currency applied to prices that do not declare one
    #[serde(rename = "DefaultCurrencyCode", skip_serializing_if = "Option::is_none")]
    pub default_currency_code: Option<String>,
}

impl Header {
    /// Name of the sending organisation, if any.
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.sender.as_ref()?.sender_name.as_deref()
    }
}

/// Product identifier (ISBN-13, GTIN, proprietary).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductIdentifier {
    /// Code list 5 identifier type
    #[serde(rename = "ProductIDType")]
    pub id_type: String,
    /// Name of a proprietary scheme
    #[serde(rename = "IDTypeName", skip_serializing_if = "Option::is_none")]
    pub id_type_name: Option<String>,
    /// Identifier value
    #[serde(rename = "IDValue")]
    pub id_value: String,
}

/// One level of a title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleElement {
    /// Code list 149 level
    #[serde(rename = "TitleElementLevel", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Title text
    #[serde(rename = "TitleText", skip_serializing_if = "Option::is_none")]
    pub title_text: Option<String>,
    /// Subtitle
    #[serde(rename = "Subtitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Title block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleDetail {
    /// Code list 15 title type
    #[serde(rename = "TitleType", skip_serializing_if = "Option::is_none")]
    pub title_type: Option<String>,
    /// Title levels
    #[serde(rename = "TitleElement")]
    pub elements: Vec<TitleElement>,
}

/// Author, editor or other contributor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contributor {
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
pub struct Language {
    /// Code list 22 role
    #[serde(rename = "LanguageRole")]
    pub role: String,
    /// ISO 639-2/B code
    #[serde(rename = "LanguageCode")]
    pub code: String,
}

/// Form and descriptive metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptiveDetail {
    /// Code list 2 composition
    #[serde(rename = "ProductComposition", skip_serializing_if = "Option::is_none")]
    pub product_composition: Option<String>,
    /// Code list 150 form
    #[serde(rename = "ProductForm", skip_serializing_if = "Option::is_none")]
    pub product_form: Option<String>,
    /// Titles
    #[serde(rename = "TitleDetail")]
    pub title_details: Vec<TitleDetail>,
    /// Contributors
    #[serde(rename = "Contributor")]
    pub contributors: Vec<Contributor>,
    /// Languages
    #[serde(rename = "Language")]
    pub languages: Vec<Language>,
}

/// Text body with an optional language attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Text {
    /// ISO 639-2/B language of the text
    #[serde(rename = "@language", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Content
    #[serde(rename = "$value")]
    pub value: String,
}

/// Descriptive text such as a blurb or table of contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    /// Code list 153 text type
    #[serde(rename = "TextType")]
    pub text_type: String,
    /// Code list 154 audiences
    #[serde(rename = "ContentAudience")]
    pub audiences: Vec<String>,
    /// Text bodies, one per language
    #[serde(rename = "Text")]
    pub texts: Vec<Text>,
}

/// Collateral block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollateralDetail {
    /// Text content
    #[serde(rename = "TextContent")]
    pub text_contents: Vec<TextContent>,
}

/// Imprint or brand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Imprint {
    /// Imprint name
    #[serde(rename = "ImprintName")]
    pub name: String,
}

/// Publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publisher {
    /// Code list 45 role
    #[serde(rename = "PublishingRole", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Publisher name
    #[serde(rename = "PublisherName")]
    pub name: String,
}

/// Dated publishing event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingDate {
    /// Code list 163 role
    #[serde(rename = "PublishingDateRole")]
    pub role: String,
    /// Date as written in the feed
    #[serde(rename = "Date")]
    pub date: String,
}

/// Publishing block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingDetail {
    /// Imprints
    #[serde(rename = "Imprint")]
    pub imprints: Vec<Imprint>,
    /// Publishers
    #[serde(rename = "Publisher")]
    pub publishers: Vec<Publisher>,
    /// Publishing dates
    #[serde(rename = "PublishingDate")]
    pub dates: Vec<PublishingDate>,
}

/// Supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Supplier {
    /// Code list 93 role
    #[serde(rename = "SupplierRole", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Supplier name
    #[serde(rename = "SupplierName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Price {
    /// Code list 58 price type; backfilled from the header
    #[serde(rename = "PriceType", skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
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
pub struct SupplyDetail {
    /// Supplier
    #[serde(rename = "Supplier", skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Supplier>,
    /// Code list 65 availability
    #[serde(rename = "ProductAvailability", skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    /// Prices
    #[serde(rename = "Price")]
    pub prices: Vec<Price>,
}

/// Supply block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSupply {
    /// Supply details
    #[serde(rename = "SupplyDetail")]
    pub supply_details: Vec<SupplyDetail>,
}

/// ONIX 3.0 product record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "Product")]
pub struct Product {
    /// Sender's unique record key
    #[serde(rename = "RecordReference")]
    pub record_reference: String,
    /// Code list 1 notification type
    #[serde(rename = "NotificationType", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    /// Identifiers
    #[serde(rename = "ProductIdentifier")]
    pub identifiers: Vec<ProductIdentifier>,
    /// Block 1
    #[serde(rename = "DescriptiveDetail", skip_serializing_if = "Option::is_none")]
    pub descriptive_detail: Option<DescriptiveDetail>,
    /// Block 2
    #[serde(rename = "CollateralDetail", skip_serializing_if = "Option::is_none")]
    pub collateral_detail: Option<CollateralDetail>,
    /// Block 4
    #[serde(rename = "PublishingDetail", skip_serializing_if = "Option::is_none")]
    pub publishing_detail: Option<PublishingDetail>,
    /// Block 6
    #[serde(rename = "ProductSupply")]
    pub product_supplies: Vec<ProductSupply>,
}

impl Product {
    /// Value of the first identifier with the given code list 5 type.
    #[must_use]
    pub fn identifier(&self, id_type: &str) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|id| id.id_type == id_type)
            .map(|id| id.id_value.as_str())
    }

    /// ISBN-13 (identifier type `15`).
    #[must_use]
    pub fn isbn13(&self) -> Option<&str> {
        self.identifier("15")
    }

    /// Title text of the first title element, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.descriptive_detail
            .as_ref()?
            .title_details
            .first()?
            .elements
            .first()?
            .title_text
            .as_deref()
    }

    /// All prices across every supply detail.
    pub fn prices(&self) -> impl Iterator<Item = &Price> {
        self.product_supplies
            .iter()
            .flat_map(|supply| &supply.supply_details)
            .flat_map(|detail| &detail.prices)
    }
}

/// Whole ONIX 3.0 message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "ONIXMessage")]
pub struct Message {
    /// Release attribute (`3.0`, `3.1`)
    #[serde(rename = "@release", skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Header
    #[serde(rename = "Header")]
    pub header: Header,
    /// Products in document order
    #[serde(rename = "Product")]
    pub products: Vec<Product>,
}

impl OnixRecord for Header {
    const TYPE_NAME: &'static str = "onix3::Header";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        CURRENT_SHORT_TAGS
    }
}

impl OnixRecord for Product {
    const TYPE_NAME: &'static str = "onix3::Product";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        CURRENT_SHORT_TAGS
    }
}

impl OnixRecord for Message {
    const TYPE_NAME: &'static str = "onix3::Message";

    fn short_tags() -> &'static [(&'static str, &'static str)] {
        CURRENT_SHORT_TAGS
    }
}

/// The ONIX 3.0 schema generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentSchema;

impl Schema for CurrentSchema {
    const GENERATION: SchemaGeneration = SchemaGeneration::Current;

    type Header = Header;
    type Product = Product;
    type Message = Message;

    fn split_message(message: Message) -> (Header, Vec<Product>) {
        (message.header, message.products)
    }

    fn apply_header_defaults(product: &mut Product, header: &Header) {
        for supply in &mut product.product_supplies {
            for detail in &mut supply.supply_details {
                for price in &mut detail.prices {
                    if price.price_type.is_none() {
                        price.price_type.clone_from(&header.default_price_type);
                    }
                    if price.currency_code.is_none() {
                        price.currency_code.clone_from(&header.default_currency_code);
                    }
                }
            }
        }

        if let Some(collateral) = product.collateral_detail.as_mut() {
            for content in &mut collateral.text_contents {
                for text in &mut content.texts {
                    if text.language.is_none() {
                        text.language.clone_from(&header.default_language_of_text);
                    }
                }
            }
        }
    }
}
