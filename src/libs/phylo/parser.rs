use super::tree::Tree;
use crate::libs::error::AlignError;
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while};
use nom::character::complete::{char, multispace0};
use nom::combinator::{cut, map, opt};
use nom::multi::separated_list1;
use nom::number::complete::double;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Offset, Parser};

// ================================================================
// Intermediate structure
// ================================================================

/// Temporary recursive node used while parsing. Newick is naturally
/// recursive; once the grammar has been consumed the structure is
/// flattened into the arena-based `Tree`.
#[derive(Debug)]
struct ParsedNode {
    name: Option<String>,
    length: Option<f64>,
    children: Vec<ParsedNode>,
}

impl ParsedNode {
    fn to_tree(self, tree: &mut Tree) -> usize {
        let id = tree.add_node();
        for child in self.children {
            let child_id = child.to_tree(tree);
            // The unwrap here is safe because `id` was just created and
            // exists in the tree.
            tree.add_child(id, child_id).unwrap();
        }
        if let Some(node) = tree.get_node_mut(id) {
            node.name = self.name;
            node.length = self.length;
        }
        id
    }
}

// ================================================================
// Parsers
// ================================================================

// Wraps another parser and ignores surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// A node label: unquoted (stops at Newick structural characters) or
// single-quoted, where two single quotes escape one.
fn parse_label(input: &str) -> IResult<&str, String> {
    let unquoted = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });
    let quoted = delimited(
        char('\''),
        map(is_not("'"), |s: &str| s.replace("''", "'")),
        char('\''),
    );

    alt((quoted, unquoted)).parse(input)
}

// A branch length following a colon. `cut` commits once the colon is
// seen, so a malformed number reports instead of backtracking.
fn parse_length(input: &str) -> IResult<&str, f64> {
    preceded(ws(char(':')), cut(double)).parse(input)
}

// General structure: (child1,child2,...)Label:Length — every part
// optional.
fn parse_subtree(input: &str) -> IResult<&str, ParsedNode> {
    let (input, children) = opt(delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), parse_subtree),
        ws(char(')')),
    ))
    .parse(input)?;
    let (input, label) = opt(parse_label).parse(input)?;
    let (input, length) = opt(parse_length).parse(input)?;

    Ok((
        input,
        ParsedNode {
            name: label.filter(|l| !l.is_empty()),
            length,
            children: children.unwrap_or_default(),
        },
    ))
}

// ================================================================
// Entry point
// ================================================================

/// Parses a single Newick tree string, terminated by ';'.
pub fn parse_newick(input: &str) -> Result<Tree, AlignError> {
    let mut parser = (ws(parse_subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (root_node, _))) => {
            let mut tree = Tree::new();
            let root_id = root_node.to_tree(&mut tree);
            tree.set_root(root_id);
            Ok(tree)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_parse_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(AlignError::Parse {
            message: "Incomplete input".to_string(),
            line: 0,
            column: 0,
            snippet: String::new(),
        }),
    }
}

// Convert a nom error into AlignError::Parse with a 1-based position.
fn make_parse_error(input: &str, e: nom::error::Error<&str>) -> AlignError {
    let offset = input.offset(e.input);
    let prefix = &input[..offset];
    let line = prefix.chars().filter(|&c| c == '\n').count() + 1;
    let last_newline = prefix.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = offset - last_newline + 1;

    AlignError::Parse {
        message: format!("unexpected input ({:?})", e.code),
        line,
        column,
        snippet: e.input.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a Newick string into a Tree.
    ///
    /// # Example
    /// ```
    /// use halign::libs::phylo::tree::Tree;
    ///
    /// // Successful parse
    /// let tree = Tree::from_newick("(A:0.1,B:0.2)Root;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// // Error handling
    /// assert!(Tree::from_newick("(A,B:oops)C;").is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Tree, AlignError> {
        parse_newick(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let tree = Tree::from_newick("(A:1,B:2)R;").unwrap();
        assert_eq!(tree.len(), 3);
        let root = tree.get_root().unwrap();
        let rn = tree.get_node(root).unwrap();
        assert_eq!(rn.name.as_deref(), Some("R"));
        assert_eq!(rn.children.len(), 2);

        let a = tree.get_node(rn.children[0]).unwrap();
        assert_eq!(a.name.as_deref(), Some("A"));
        assert_eq!(a.length, Some(1.0));
    }

    #[test]
    fn test_parse_nested_and_scientific() {
        let tree = Tree::from_newick("((A:1e30,B:2)M:0.5,C:3)R;").unwrap();
        assert_eq!(tree.len(), 5);
        let root = tree.get_root().unwrap();
        let m_id = tree.get_node(root).unwrap().children[0];
        let m = tree.get_node(m_id).unwrap();
        assert_eq!(m.name.as_deref(), Some("M"));
        assert_eq!(m.length, Some(0.5));
        let a = tree.get_node(m.children[0]).unwrap();
        assert_eq!(a.length, Some(1e30));
    }

    #[test]
    fn test_parse_unlabeled_internal() {
        // internal nodes may be unlabeled at parse time; consumers that
        // need names reject them later
        let tree = Tree::from_newick("(A,B);").unwrap();
        let root = tree.get_root().unwrap();
        assert!(tree.get_node(root).unwrap().name.is_none());
    }

    #[test]
    fn test_parse_quoted_label() {
        let tree = Tree::from_newick("('Homo sapiens':1,B:2)R;").unwrap();
        let root = tree.get_root().unwrap();
        let a_id = tree.get_node(root).unwrap().children[0];
        assert_eq!(
            tree.get_node(a_id).unwrap().name.as_deref(),
            Some("Homo sapiens")
        );
    }

    #[test]
    fn test_parse_error_position() {
        let err = Tree::from_newick("(A:1,B:bad)R;").unwrap_err();
        match err {
            AlignError::Parse { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 1);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
