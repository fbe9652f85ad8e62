use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::model::{DiscoveredSet, Node};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

pub fn search_nodes<'a>(
    nodes: &'a [Node],
    discovered: &DiscoveredSet,
    query: &str,
) -> Vec<&'a str> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut ranked = nodes
        .iter()
        .filter(|node| discovered.contains(&node.id))
        .filter_map(|node| {
            fuzzy_match_score(&matcher, &node.title, query).map(|score| (score, node.id.as_str()))
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    ranked.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(id: &str, title: &str) -> Node {
        Node {
            id: id.to_owned(),
            title: title.to_owned(),
            ..Node::default()
        }
    }

    #[test]
    fn only_discovered_titles_are_searchable() {
        let nodes = vec![
            titled("web", "Web Exploitation"),
            titled("secret", "Web Cache Poisoning"),
        ];
        let discovered = DiscoveredSet::from(["web".to_owned()]);
        assert_eq!(search_nodes(&nodes, &discovered, "web"), vec!["web"]);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let nodes = vec![titled("a", "Anything")];
        let discovered = DiscoveredSet::from(["a".to_owned()]);
        assert!(search_nodes(&nodes, &discovered, "   ").is_empty());
    }

    #[test]
    fn fuzzy_query_finds_abbreviation() {
        let nodes = vec![titled("re", "Reverse Engineering"), titled("net", "Networking")];
        let discovered = nodes.iter().map(|node| node.id.clone()).collect();
        assert_eq!(search_nodes(&nodes, &discovered, "revng").first(), Some(&"re"));
    }
}
