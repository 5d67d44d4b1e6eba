//! Parser implementation using chumsky

use std::rc::Rc;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse a document into its element tree
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    parse_named(input, None)
}

/// Parse a document, tagging every element location with a source name
pub fn parse_named(input: &str, source: Option<&str>) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let elements = document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect::<Vec<_>>())?;

    let index = LineIndex::new(input);
    let source: Option<Rc<str>> = source.map(Rc::from);
    let elements = elements
        .into_iter()
        .map(|element| index.locate(element, &source))
        .collect();

    Ok(Document { elements, source })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Vec<Element>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Name(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let string_literal = select! {
        Token::Str(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let attribute = name
        .clone()
        .then_ignore(just(Token::Equals))
        .then(string_literal)
        .map(|(name, value)| Attribute { name, value });

    let element = recursive(|element| {
        // `<tag ...>children</tag>`
        let content = just(Token::TagClose)
            .ignore_then(element.repeated().collect::<Vec<_>>())
            .then_ignore(just(Token::CloseTagOpen))
            .then(name.clone())
            .then_ignore(just(Token::TagClose))
            .map(|(children, closing)| (children, Some(closing)));

        // `<tag .../>`
        let empty = just(Token::EmptyTagClose)
            .map(|_| (Vec::<Element>::new(), None::<Spanned<String>>));

        just(Token::TagOpen)
            .ignore_then(name.clone())
            .then(attribute.repeated().collect::<Vec<_>>())
            .then(choice((empty, content)))
            .try_map(|((name, attributes), (children, closing)), span: SimpleSpan| {
                if let Some(closing) = closing {
                    if closing.node != name.node {
                        return Err(Rich::custom(
                            span,
                            format!(
                                "closing tag '{}' does not match opening tag '{}'",
                                closing.node, name.node
                            ),
                        ));
                    }
                }
                Ok(Element {
                    name,
                    attributes,
                    children,
                    location: Location::from_span(span_range(&span)),
                })
            })
            .boxed()
    });

    // Document is a list of top-level elements
    element
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_element() {
        let doc = parse(r#"<int value="1"/>"#).expect("Should parse");
        assert_eq!(doc.elements.len(), 1);
        assert_eq!(doc.elements[0].tag(), "int");
        assert_eq!(doc.elements[0].attribute("value"), Some("1"));
        assert!(doc.elements[0].children.is_empty());
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse(
            r#"<rb>
                <list>
                    <int value="1"/>
                    <int value="2"/>
                </list>
            </rb>"#,
        )
        .expect("Should parse");
        assert_eq!(doc.elements.len(), 1);
        let list = &doc.elements[0].children[0];
        assert_eq!(list.tag(), "list");
        assert_eq!(list.children.len(), 2);
    }

    #[test]
    fn test_parse_multiple_top_level_elements() {
        let doc = parse(r#"<int value="1"/><string value="a"/>"#).expect("Should parse");
        let tags: Vec<_> = doc.elements.iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["int", "string"]);
    }

    #[test]
    fn test_locations_are_one_based() {
        let doc = parse_named("<rb>\n  <bool value=\"true\"/>\n</rb>", Some("doc.xml"))
            .expect("Should parse");
        let child = &doc.elements[0].children[0];
        assert_eq!(child.location.line, 2);
        assert_eq!(child.location.column, 3);
        assert_eq!(child.location.to_string(), "doc.xml:2:3");
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let errors = parse("<list></table>").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_unterminated_element() {
        assert!(parse("<list>").is_err());
    }

    #[test]
    fn test_text_content_rejected() {
        assert!(parse("<string>hello</string>").is_err());
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(parse("  <!-- nothing -->  ").is_err());
    }
}
