use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, map, opt, recognize, value},
    error::context,
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};

use super::{
    text::parse_braced,
    token::{ParserResult, RawAttribute, RawAttributeValue, Token},
};

/// `Task`, `Ask.Text`, `Example.Input`
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_tag_name(input: &str) -> ParserResult<&str> {
    context(
        "tag name",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic()),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
        )),
    )(input)
}

fn parse_attribute_name(input: &str) -> ParserResult<&str> {
    context(
        "attribute name",
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == ':'),
        )),
    )(input)
}

fn parse_quoted(input: &str) -> ParserResult<&str> {
    context(
        "quoted string",
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
    )(input)
}

fn parse_attribute_value(input: &str) -> ParserResult<RawAttributeValue> {
    context(
        "attribute value",
        alt((
            map(parse_quoted, |s: &str| RawAttributeValue::Quoted(s.to_string())),
            map(parse_braced, |s: &str| {
                RawAttributeValue::Expression(s.trim().to_string())
            }),
        )),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_attribute(input: &str) -> ParserResult<RawAttribute> {
    let (input, name) = parse_attribute_name(input)?;
    let (input, value) = opt(preceded(
        delimited(multispace0, char('='), multispace0),
        cut(parse_attribute_value),
    ))(input)?;
    Ok((
        input,
        RawAttribute {
            name: name.to_string(),
            value: value.unwrap_or(RawAttributeValue::Flag),
        },
    ))
}

fn open_tag_body(input: &str) -> ParserResult<Token> {
    let (input, _) = char('<')(input)?;
    let (input, name) = parse_tag_name(input)?;
    let (input, attributes) = many0(preceded(multispace1, parse_attribute))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, self_closing) = cut(context(
        "end of tag",
        alt((value(true, tag("/>")), value(false, tag(">")))),
    ))(input)?;
    Ok((
        input,
        Token::OpenTag {
            name: name.to_string(),
            attributes,
            self_closing,
        },
    ))
}

/// `<Tag a="x" b={y}>` or `<Tag ... />`
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_open_tag(input: &str) -> ParserResult<Token> {
    context("open tag", open_tag_body)(input)
}

/// `</Tag>`
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_close_tag(input: &str) -> ParserResult<Token> {
    context(
        "close tag",
        map(
            preceded(
                tag("</"),
                cut(terminated(
                    delimited(multispace0, parse_tag_name, multispace0),
                    char('>'),
                )),
            ),
            |name: &str| Token::CloseTag(name.to_string()),
        ),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_tag_with_attributes() {
        let (rest, token) =
            parse_open_tag(r#"<Ask.Text name="who" label='Who' required default={inputs.x}>rest"#)
                .unwrap();
        assert_eq!(rest, "rest");
        assert_eq!(
            token,
            Token::OpenTag {
                name: "Ask.Text".to_string(),
                attributes: vec![
                    RawAttribute {
                        name: "name".to_string(),
                        value: RawAttributeValue::Quoted("who".to_string()),
                    },
                    RawAttribute {
                        name: "label".to_string(),
                        value: RawAttributeValue::Quoted("Who".to_string()),
                    },
                    RawAttribute {
                        name: "required".to_string(),
                        value: RawAttributeValue::Flag,
                    },
                    RawAttribute {
                        name: "default".to_string(),
                        value: RawAttributeValue::Expression("inputs.x".to_string()),
                    },
                ],
                self_closing: false,
            }
        );
    }

    #[test]
    fn test_self_closing_multiline() {
        let (rest, token) = parse_open_tag("<Task\n  preset=\"review\"\n/>").unwrap();
        assert_eq!(rest, "");
        assert!(matches!(
            token,
            Token::OpenTag {
                self_closing: true,
                ..
            }
        ));
    }

    #[test]
    fn test_close_tag() {
        let (rest, token) = parse_close_tag("</ Example.Input >x").unwrap();
        assert_eq!(token, Token::CloseTag("Example.Input".to_string()));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_missing_attribute_value_is_failure() {
        assert!(matches!(
            parse_open_tag("<Task preset=>"),
            Err(nom::Err::Failure(_))
        ));
    }
}
