//! Reference and short element names.
//!
//! Each table pairs the reference name of an element with its short name. The
//! tables only cover elements the bundled schemas bind; unknown names pass
//! through decoding untranslated and are ignored.

/// ONIX 3.0 element names.
pub const CURRENT_SHORT_TAGS: &[(&str, &str)] = &[
    ("ONIXMessage", "ONIXmessage"),
    ("Header", "header"),
    ("Sender", "sender"),
    ("SenderName", "x298"),
    ("ContactName", "x299"),
    ("EmailAddress", "j272"),
    ("SentDateTime", "x307"),
    ("MessageNote", "m183"),
    ("DefaultLanguageOfText", "m184"),
    ("DefaultPriceType", "x310"),
    ("DefaultCurrencyCode", "m186"),
    ("Product", "product"),
    ("RecordReference", "a001"),
    ("NotificationType", "a002"),
    ("RecordSourceType", "a194"),
    ("RecordSourceName", "a197"),
    ("ProductIdentifier", "productidentifier"),
    ("ProductIDType", "b221"),
    ("IDTypeName", "b233"),
    ("IDValue", "b244"),
    ("DescriptiveDetail", "descriptivedetail"),
    ("ProductComposition", "x314"),
    ("ProductForm", "b012"),
    ("TitleDetail", "titledetail"),
    ("TitleType", "b202"),
    ("TitleElement", "titleelement"),
    ("TitleElementLevel", "x409"),
    ("TitleText", "b203"),
    ("Subtitle", "b029"),
    ("Contributor", "contributor"),
    ("SequenceNumber", "b034"),
    ("ContributorRole", "b035"),
    ("PersonName", "b036"),
    ("PersonNameInverted", "b037"),
    ("Language", "language"),
    ("LanguageRole", "b253"),
    ("LanguageCode", "b252"),
    ("CollateralDetail", "collateraldetail"),
    ("TextContent", "textcontent"),
    ("TextType", "x426"),
    ("ContentAudience", "x427"),
    ("Text", "d104"),
    ("PublishingDetail", "publishingdetail"),
    ("Imprint", "imprint"),
    ("ImprintName", "b079"),
    ("Publisher", "publisher"),
    ("PublishingRole", "b291"),
    ("PublisherName", "b081"),
    ("PublishingDate", "publishingdate"),
    ("PublishingDateRole", "x448"),
    ("Date", "b306"),
    ("ProductSupply", "productsupply"),
    ("SupplyDetail", "supplydetail"),
    ("Supplier", "supplier"),
    ("SupplierRole", "j292"),
    ("SupplierName", "j137"),
    ("ProductAvailability", "j396"),
    ("Price", "price"),
    ("PriceType", "x462"),
    ("PriceAmount", "j151"),
    ("CurrencyCode", "j152"),
];

/// ONIX 2.1 element names.
pub const LEGACY_SHORT_TAGS: &[(&str, &str)] = &[
    ("ONIXMessage", "ONIXmessage"),
    ("Header", "header"),
    ("FromCompany", "m174"),
    ("FromPerson", "m175"),
    ("FromEmail", "m283"),
    ("ToCompany", "m176"),
    ("SentDate", "m182"),
    ("MessageNote", "m183"),
    ("DefaultLanguageOfText", "m184"),
    ("DefaultPriceTypeCode", "m185"),
    ("DefaultCurrencyCode", "m186"),
    ("Product", "product"),
    ("RecordReference", "a001"),
    ("NotificationType", "a002"),
    ("ISBN", "b004"),
    ("EAN13", "b005"),
    ("ProductIdentifier", "productidentifier"),
    ("ProductIDType", "b221"),
    ("IDValue", "b244"),
    ("ProductForm", "b012"),
    ("Title", "title"),
    ("TitleType", "b202"),
    ("TitleText", "b203"),
    ("Subtitle", "b029"),
    ("Contributor", "contributor"),
    ("SequenceNumber", "b034"),
    ("ContributorRole", "b035"),
    ("PersonName", "b036"),
    ("PersonNameInverted", "b037"),
    ("Language", "language"),
    ("LanguageRole", "b253"),
    ("LanguageCode", "b252"),
    ("OtherText", "othertext"),
    ("TextTypeCode", "d102"),
    ("TextFormat", "d103"),
    ("Text", "d104"),
    ("TextLinkType", "d105"),
    ("TextLink", "d106"),
    ("Publisher", "publisher"),
    ("PublishingRole", "b291"),
    ("PublisherName", "b081"),
    ("PublicationDate", "b003"),
    ("SupplyDetail", "supplydetail"),
    ("SupplierName", "j137"),
    ("ProductAvailability", "j396"),
    ("Price", "price"),
    ("PriceTypeCode", "j148"),
    ("PriceAmount", "j151"),
    ("CurrencyCode", "j152"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique(table: &[(&str, &str)]) {
        let references: HashSet<_> = table.iter().map(|(r, _)| r).collect();
        let shorts: HashSet<_> = table.iter().map(|(_, s)| s).collect();
        assert_eq!(references.len(), table.len());
        assert_eq!(shorts.len(), table.len());
    }

    #[test]
    fn test_current_tags_are_unique() {
        assert_unique(CURRENT_SHORT_TAGS);
    }

    #[test]
    fn test_legacy_tags_are_unique() {
        assert_unique(LEGACY_SHORT_TAGS);
    }
}
