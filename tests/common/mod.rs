//! Common feed builders shared across the test suite.

#![allow(dead_code)]

/// Comment long enough to push every feed past the streaming sniff length.
fn padding() -> String {
    format!("<!--{}-->", " ".repeat(520))
}

/// ONIX 3.0 header with sender and price defaults.
pub fn current_header() -> &'static str {
    "<Header><Sender><SenderName>Acme Books</SenderName></Sender>\
     <SentDateTime>20240101T0900Z</SentDateTime>\
     <DefaultPriceType>02</DefaultPriceType>\
     <DefaultCurrencyCode>GBP</DefaultCurrencyCode></Header>"
}

/// ONIX 3.0 product in reference tags with one price and no currency.
pub fn current_product(reference: &str, isbn: &str, title: &str) -> String {
    format!(
        "<Product><RecordReference>{reference}</RecordReference>\
         <NotificationType>03</NotificationType>\
         <ProductIdentifier><ProductIDType>15</ProductIDType><IDValue>{isbn}</IDValue></ProductIdentifier>\
         <DescriptiveDetail><TitleDetail><TitleType>01</TitleType>\
         <TitleElement><TitleElementLevel>01</TitleElementLevel><TitleText>{title}</TitleText>\
         </TitleElement></TitleDetail></DescriptiveDetail>\
         <ProductSupply><SupplyDetail><Price><PriceAmount>9.99</PriceAmount></Price>\
         </SupplyDetail></ProductSupply></Product>"
    )
}

/// ONIX 3.0 product in short tags.
pub fn current_short_product(reference: &str, isbn: &str, title: &str) -> String {
    format!(
        "<product><a001>{reference}</a001><a002>03</a002>\
         <productidentifier><b221>15</b221><b244>{isbn}</b244></productidentifier>\
         <descriptivedetail><titledetail><b202>01</b202>\
         <titleelement><x409>01</x409><b203>{title}</b203></titleelement>\
         </titledetail></descriptivedetail></product>"
    )
}

/// A whole ONIX 3.0 feed in the reference dialect.
pub fn current_feed(products: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ONIXMessage release=\"3.0\">\n{}\n{}\n{}\n</ONIXMessage>\n",
        current_header(),
        padding(),
        products.join("\n"),
    )
}

/// A whole ONIX 3.0 feed in the short dialect.
pub fn current_short_feed(products: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ONIXmessage release=\"3.0\">\n\
         <header><sender><x298>Acme Books</x298></sender><m186>USD</m186></header>\n{}\n{}\n\
         </ONIXmessage>\n",
        padding(),
        products.join("\n"),
    )
}

/// `count` well-formed ONIX 3.0 products numbered from 1.
pub fn current_products(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| current_product(&i.to_string(), &format!("978000000{i:04}"), &format!("Title {i}")))
        .collect()
}

/// ONIX 2.1 header.
pub fn legacy_header() -> &'static str {
    "<Header><FromCompany>Old Press</FromCompany><SentDate>20090101</SentDate>\
     <DefaultPriceTypeCode>01</DefaultPriceTypeCode>\
     <DefaultCurrencyCode>EUR</DefaultCurrencyCode></Header>"
}

/// ONIX 2.1 product with one `OtherText` block per entry in `texts`, and
/// `bodies` of those blocks carrying a `Text` element.
pub fn legacy_product(reference: &str, texts: usize, bodies: &[&str]) -> String {
    let other_texts: String = (0..texts)
        .map(|i| match bodies.get(i) {
            Some(body) => format!(
                "<OtherText><TextTypeCode>0{i}</TextTypeCode><Text>{body}</Text></OtherText>"
            ),
            None => format!("<OtherText><TextTypeCode>0{i}</TextTypeCode></OtherText>"),
        })
        .collect();
    format!(
        "<Product><RecordReference>{reference}</RecordReference>\
         <EAN13>978000000{reference:0>4}</EAN13>\
         <Title><TitleType>01</TitleType><TitleText>Legacy {reference}</TitleText></Title>\
         {other_texts}\
         <SupplyDetail><Price><PriceAmount>5.00</PriceAmount></Price></SupplyDetail></Product>"
    )
}

/// A whole ONIX 2.1 feed in the reference dialect.
pub fn legacy_feed(products: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<ONIXMessage release=\"2.1\">\n{}\n{}\n{}\n</ONIXMessage>\n",
        legacy_header(),
        padding(),
        products.join("\n"),
    )
}

/// A whole ONIX 2.1 feed in the short dialect.
pub fn legacy_short_feed(products: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<ONIXmessage release=\"2.1\">\n\
         <header><m174>Old Press</m174><m186>CAD</m186></header>\n{}\n{}\n</ONIXmessage>\n",
        padding(),
        products.join("\n"),
    )
}
