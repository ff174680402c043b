//! Reader-side view: search and sort over a post list.

use crate::dates;
use crate::types::Post;

/// Display order for the reader view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Filter `posts` by a case-insensitive `search` over title, plain-text
/// content and date, then sort by display date. The sort is stable, so
/// posts sharing a date keep their stored order.
pub fn visible_posts(posts: &[Post], search: Option<&str>, order: SortOrder) -> Vec<Post> {
    let query = search
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut visible: Vec<Post> = posts
        .iter()
        .filter(|post| match &query {
            Some(q) => matches(post, q),
            None => true,
        })
        .cloned()
        .collect();

    match order {
        SortOrder::Newest => {
            visible.sort_by(|a, b| dates::sort_key(&b.date).cmp(&dates::sort_key(&a.date)))
        }
        SortOrder::Oldest => {
            visible.sort_by(|a, b| dates::sort_key(&a.date).cmp(&dates::sort_key(&b.date)))
        }
    }
    visible
}

fn matches(post: &Post, query: &str) -> bool {
    post.title.to_lowercase().contains(query)
        || strip_markdown(&post.content).to_lowercase().contains(query)
        || post.date.to_lowercase().contains(query)
}

/// Remove the markup the editor understands: leading `#` headings,
/// `**bold**` / `*italic*` asterisks and `{color:X}..{/color}` spans.
pub fn strip_markdown(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let hashes = line.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) && line[hashes..].starts_with(char::is_whitespace) {
            lines.push(line[hashes..].trim_start());
        } else {
            lines.push(line);
        }
    }
    let joined = lines.join("\n");

    let mut out = String::with_capacity(joined.len());
    let mut rest = joined.as_str();
    while let Some(start) = rest.find("{color:") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find('}') {
            Some(end) => rest = &tail[end + 1..],
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.replace("{/color}", "").replace('*', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PostId;

    fn post(id: &str, date: &str, title: &str, content: &str) -> Post {
        Post {
            id: PostId::from(id),
            date: date.to_string(),
            title: title.to_string(),
            title_color: None,
            content: content.to_string(),
            color: "#ffffff".to_string(),
            images: vec![],
        }
    }

    #[test]
    fn strips_bold_italic_color_and_headings() {
        let text = "# Title\n**bold** and *soft* {color:#f0f}pink{/color}";
        assert_eq!(strip_markdown(text), "Title\nbold and soft pink");
    }

    #[test]
    fn newest_first_by_default() {
        let posts = vec![
            post("a", "01/01/24", "old", ""),
            post("b", "01/06/25", "new", ""),
            post("c", "15/03/24", "mid", ""),
        ];
        let ids: Vec<_> = visible_posts(&posts, None, SortOrder::default())
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn search_looks_inside_markup() {
        let posts = vec![
            post("a", "01/01/24", "first", "{color:red}Neon{/color} lights"),
            post("b", "02/01/24", "second", "nothing here"),
        ];
        let found = visible_posts(&posts, Some("  NEON "), SortOrder::Oldest);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.0, "a");
    }

    #[test]
    fn same_date_keeps_stored_order() {
        let posts = vec![
            post("x", "05/05/25", "", ""),
            post("y", "05/05/25", "", ""),
        ];
        let ids: Vec<_> = visible_posts(&posts, None, SortOrder::Newest)
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn huge_year_sorts_last_instead_of_panicking() {
        let posts = vec![
            post("bad", "01/01/2147483000", "", ""),
            post("ok", "01/01/25", "", ""),
        ];
        let ids: Vec<_> = visible_posts(&posts, None, SortOrder::Newest)
            .into_iter()
            .map(|p| p.id.0)
            .collect();
        assert_eq!(ids, vec!["ok", "bad"]);
    }
}
