// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;
use std::ops::Range;

use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionFragment {
    Group(String),
    Range(Range<u32>),
    Single(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionExpression {
    All,
    None,
    Explicit(Vec<SelectionFragment>),
}

impl SelectionExpression {
    /// Parses a [`SelectionExpression`] from a string input.
    ///
    /// Syntax Examples:
    /// ```ignore
    /// 0, 1, 2 // Select faces 0, 1 and 2
    /// * // Select all faces
    /// 0..1 // Select a range of faces
    /// 0..5, 7..10, 13, 17, 22 // Select multiple ranges, and some single faces
    /// @selected // Select the faces marked in the `selected` channel
    ///  // (empty string), selects nothing
    /// ```
    pub fn parse(input: &str) -> Result<SelectionExpression> {
        use nom::character::complete::{alphanumeric1, anychar};
        use nom::combinator::verify;
        use nom::multi::many0_count;
        use nom::sequence::pair;
        use nom::{
            branch::alt,
            bytes::complete::tag,
            character::complete::{char, digit1},
            combinator::{map, map_res, opt, recognize},
            multi::{many0, separated_list1},
            sequence::{preceded, tuple},
            IResult, Parser,
        };

        fn number(input: &str) -> IResult<&str, u32> {
            map_res(digit1, str::parse::<u32>).parse(input)
        }

        // https://stackoverflow.com/a/61329008
        pub fn identifier<'a, E: nom::error::ParseError<&'a str>>(
            s: &'a str,
        ) -> IResult<&'a str, &'a str, E> {
            recognize(pair(
                verify(anychar, |&c| c.is_lowercase()),
                many0_count(preceded(opt(char('_')), alphanumeric1)),
            ))(s)
        }

        fn single(input: &str) -> IResult<&str, SelectionFragment> {
            map(number, SelectionFragment::Single).parse(input)
        }

        fn range(input: &str) -> IResult<&str, SelectionFragment> {
            map(tuple((number, tag(".."), number)), |(x, _, y)| {
                SelectionFragment::Range(x..y)
            })
            .parse(input)
        }

        fn group_fragment(input: &str) -> IResult<&str, SelectionFragment> {
            map(tuple((tag("@"), identifier)), |(_, y)| {
                SelectionFragment::Group(y.into())
            })
            .parse(input)
        }

        fn selection_fragment(input: &str) -> IResult<&str, SelectionFragment> {
            alt((group_fragment, range, single)).parse(input)
        }

        fn fragments_all(input: &str) -> IResult<&str, SelectionExpression> {
            map(tag("*"), |_| SelectionExpression::All).parse(input)
        }

        fn whitespace(input: &str) -> IResult<&str, ()> {
            map(many0(tag(" ")), |_| ()).parse(input)
        }

        fn separator(input: &str) -> IResult<&str, ()> {
            map(tuple((whitespace, tag(","), whitespace)), |_| ()).parse(input)
        }

        fn fragments_explicit(input: &str) -> IResult<&str, SelectionExpression> {
            map(
                separated_list1(separator, selection_fragment),
                SelectionExpression::Explicit,
            )
            .parse(input)
        }

        fn fragments(input: &str) -> IResult<&str, SelectionExpression> {
            map(
                tuple((whitespace, alt((fragments_all, fragments_explicit)))),
                |(_, res)| res,
            )
            .parse(input)
        }

        if input.trim().is_empty() {
            Ok(SelectionExpression::None)
        } else {
            fragments(input)
                .map_err(|err| anyhow!("Error parsing selection: {}", err))
                .and_then(|(extra_input, parsed)| {
                    if !extra_input.trim().is_empty() {
                        bail!("Extra input when parsing selection: '{extra_input}'")
                    } else {
                        Ok(parsed)
                    }
                })
        }
    }

    /// Returns a canonical string representation for this selection
    /// expression. Parsing it back gives the same expression.
    pub fn unparse(&self) -> String {
        match self {
            SelectionExpression::All => "*".into(),
            SelectionExpression::None => "".into(),
            SelectionExpression::Explicit(segments) => {
                let mut out = String::new();
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    // Writing to a String never fails
                    let _ = match segment {
                        SelectionFragment::Group(name) => write!(out, "@{name}"),
                        SelectionFragment::Range(r) => write!(out, "{}..{}", r.start, r.end),
                        SelectionFragment::Single(i) => write!(out, "{i}"),
                    };
                }
                out
            }
        }
    }

    /// Builds the shortest explicit expression for a list of indices. Runs of
    /// two or more consecutive indices become ranges. The input is sorted and
    /// deduplicated first. An empty list gives [`SelectionExpression::None`].
    pub fn from_indices(indices: impl IntoIterator<Item = u32>) -> SelectionExpression {
        let sorted = indices.into_iter().sorted().dedup().collect_vec();
        if sorted.is_empty() {
            return SelectionExpression::None;
        }

        let mut fragments = vec![];
        let mut run_start = sorted[0];
        let mut run_end = sorted[0];
        let mut push_run = |start: u32, end: u32| {
            if start == end {
                fragments.push(SelectionFragment::Single(start));
            } else {
                fragments.push(SelectionFragment::Range(start..end + 1));
            }
        };
        for &i in &sorted[1..] {
            if i == run_end + 1 {
                run_end = i;
            } else {
                push_run(run_start, run_end);
                run_start = i;
                run_end = i;
            }
        }
        push_run(run_start, run_end);

        SelectionExpression::Explicit(fragments)
    }

    /// Returns the index fragments that reach past the last of `num_faces`
    /// faces. Groups are never out of range.
    pub fn out_of_range_fragments(&self, num_faces: u32) -> Vec<&SelectionFragment> {
        match self {
            SelectionExpression::Explicit(fragments) => fragments
                .iter()
                .filter(|fragment| match fragment {
                    SelectionFragment::Range(r) => r.end > num_faces,
                    SelectionFragment::Single(s) => *s >= num_faces,
                    SelectionFragment::Group(_) => false,
                })
                .collect(),
            SelectionExpression::All | SelectionExpression::None => vec![],
        }
    }
}

impl SelectionFragment {
    fn matches(&self, index: u32, groups: &HashMap<&str, BorrowedChannel<'_>>, id: FaceId) -> bool {
        match self {
            SelectionFragment::Range(r) => r.contains(&index),
            SelectionFragment::Single(s) => *s == index,
            SelectionFragment::Group(name) => groups[name.as_str()][id],
        }
    }
}

type BorrowedChannel<'a> = crate::sync::BorrowedRef<'a, Channel<FaceId, bool>>;

impl HalfEdgeMesh {
    /// Returns the faces matched by `expression`, in face index order. Each
    /// face is returned once, even if several fragments match it. Indices
    /// past the last face match nothing and are logged as a warning. Fails
    /// when a group fragment names a face channel that doesn't exist.
    pub fn resolve_face_selection_full(
        &self,
        expression: &SelectionExpression,
    ) -> Result<Vec<FaceId>> {
        let conn = self.read_connectivity();
        match expression {
            SelectionExpression::All => Ok(conn.iter_faces().map(|(f, _)| f).collect()),
            SelectionExpression::None => Ok(vec![]),
            SelectionExpression::Explicit(fragments) => {
                let num_faces = conn.num_faces() as u32;
                for fragment in expression.out_of_range_fragments(num_faces) {
                    log::warn!(
                        "Selection fragment {fragment:?} is out of range, the mesh has {num_faces} faces"
                    );
                }

                let mut groups: HashMap<&str, BorrowedChannel<'_>> = HashMap::new();
                for fragment in fragments {
                    if let SelectionFragment::Group(name) = fragment {
                        if !groups.contains_key(name.as_str()) {
                            let ch = self
                                .channels
                                .read_channel_by_name::<FaceId, bool>(name)
                                .with_context(|| format!("Cannot resolve selection group @{name}"))?;
                            groups.insert(name.as_str(), ch);
                        }
                    }
                }

                Ok(conn
                    .iter_faces()
                    .enumerate()
                    .filter(|(i, (id, _))| {
                        fragments
                            .iter()
                            .any(|fragment| fragment.matches(*i as u32, &groups, *id))
                    })
                    .map(|(_, (id, _))| id)
                    .collect())
            }
        }
    }
}
