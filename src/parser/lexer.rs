//! Lexer for graph documents using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Tag delimiters (longer patterns first)
    #[token("</")]
    CloseTagOpen,
    #[token("/>")]
    EmptyTagClose,
    #[token("<")]
    TagOpen,
    #[token(">")]
    TagClose,
    #[token("=")]
    Equals,

    // Element and attribute names
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.:\-]*", |lex| lex.slice().to_string())]
    Name(String),

    // Attribute values, either quote style
    #[regex(r#""[^"]*""#, quoted)]
    #[regex(r"'[^']*'", quoted)]
    Str(String),

    // Comments and the `<?xml ... ?>` prolog (skip)
    #[regex(r"<!--([^-]|-[^-])*-->", logos::skip)]
    Comment,
    #[regex(r"<\?([^?]|\?[^>])*\?>", logos::skip)]
    Prolog,

    /// Text the lexer could not classify; the grammar reports it
    Invalid(String),
}

fn quoted(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    unescape(&s[1..s.len() - 1])
}

/// Replace the predefined markup entities in an attribute value
pub fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input).spanned().map(move |(tok, span)| match tok {
        Ok(t) => (t, span),
        Err(()) => (Token::Invalid(input[span.clone()].to_string()), span),
    })
}
