//! PubMed research source implementation using E-utilities API.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{Paper, PaperBuilder, SearchQuery, SourceType};
use crate::sources::{get_text, Source, SourceError};
use crate::utils::HttpClient;

/// PubMed E-utilities API base URL
const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Maximum number of PMIDs resolved by the search stage
const PUBMED_MAX_IDS: usize = 100;

/// Query clause restricting results to reviews
const REVIEW_CLAUSE: &str = "AND review[Publication Type]";

/// PubMed research source
///
/// Uses NCBI E-utilities in two stages: `esearch` resolves the topic to the
/// newest PMIDs within the recency window, then a single `efetch` call pulls
/// the full records.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl PubMedSource {
    /// Create a new PubMed source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: PUBMED_EUTILS_URL.to_string(),
        }
    }

    /// Point the source at a different E-utilities root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the search term with field qualifier and optional review filter
    fn build_term(query: &SearchQuery) -> String {
        let mut term = format!("{}[Title/Abstract]", query.topic);
        if query.reviews_only {
            term.push(' ');
            term.push_str(REVIEW_CLAUSE);
        }
        term
    }

    /// Build E-utilities search URL
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let params = [
            ("db", "pubmed".to_string()),
            ("term", Self::build_term(query)),
            ("datetype", "edat".to_string()),
            ("reldate", query.days.to_string()),
            ("retmax", PUBMED_MAX_IDS.to_string()),
            ("sort", "date".to_string()),
            ("retmode", "json".to_string()),
        ];

        let params = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/esearch.fcgi?{}", self.base_url, params)
    }

    /// Build E-utilities fetch URL for specific PubMed IDs
    fn build_fetch_url(&self, ids: &[String]) -> String {
        format!(
            "{}/efetch.fcgi?db=pubmed&id={}&retmode=xml",
            self.base_url,
            urlencoding::encode(&ids.join(","))
        )
    }

    /// Parse E-utilities search response JSON
    fn parse_search_response(json: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            esearchresult: ESearchResult,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
        }

        let result: ESearchResponse = serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search JSON: {}", e)))?;

        Ok(result.esearchresult.idlist)
    }

    /// Parse E-utilities fetch response XML
    ///
    /// Titles and abstracts keep the text of inline markup (`<i>`, `<sup>`,
    /// MathML). Each `PubmedArticle` is assembled on its own, so a record
    /// without PMID or title is dropped without affecting the others. If the
    /// XML breaks off, records completed before the error are kept.
    fn parse_fetch_response(xml: &str) -> Result<Vec<Paper>, SourceError> {
        let mut reader = Reader::from_str(xml);
        let mut papers = Vec::new();
        let mut current: Option<ArticleFields> = None;
        let mut path: Vec<Vec<u8>> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.local_name().as_ref().to_vec();
                    if name == b"PubmedArticle" {
                        current = Some(ArticleFields::default());
                        path.clear();
                    } else if let Some(fields) = current.as_mut() {
                        fields.open(&path, &name);
                        path.push(name);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if let Some(fields) = current.as_mut() {
                        let name = e.local_name().as_ref().to_vec();
                        fields.open(&path, &name);
                        path.push(name);
                        fields.close(&path);
                        path.pop();
                    }
                }
                Ok(Event::End(e)) => {
                    if e.local_name().as_ref() == b"PubmedArticle" {
                        if let Some(paper) = current.take().and_then(ArticleFields::into_paper) {
                            papers.push(paper);
                        }
                        path.clear();
                    } else if let Some(fields) = current.as_mut() {
                        fields.close(&path);
                        path.pop();
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(fields) = current.as_mut() {
                        let text = e
                            .unescape()
                            .map(|t| t.into_owned())
                            .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                        fields.text(&path, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(fields) = current.as_mut() {
                        fields.text(&path, &String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    if papers.is_empty() {
                        return Err(SourceError::Parse(format!(
                            "Failed to parse PubMed fetch XML: {}",
                            e
                        )));
                    }
                    tracing::warn!(
                        error = %e,
                        kept = papers.len(),
                        "PubMed fetch XML broke off, keeping completed records"
                    );
                    break;
                }
            }
        }

        Ok(papers)
    }
}

/// Text collected while walking one `<PubmedArticle>`
#[derive(Debug, Default)]
struct ArticleFields {
    pmid: String,
    title: String,
    abstract_text: String,
    /// `AbstractText` sections opened under `Abstract` so far
    abstract_sections: usize,
    authors: Vec<String>,
    author: AuthorName,
}

#[derive(Debug, Default)]
struct AuthorName {
    last: String,
    fore: String,
    collective: String,
}

impl AuthorName {
    fn display(&self) -> Option<String> {
        let collective = self.collective.trim();
        if !collective.is_empty() {
            return Some(collective.to_string());
        }
        let name = [self.fore.trim(), self.last.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }
}

impl ArticleFields {
    /// `path` is the element stack below `PubmedArticle`, without `name`
    fn open(&mut self, path: &[Vec<u8>], name: &[u8]) {
        match name {
            b"AbstractText" if ends_with(path, &["Abstract"]) => self.abstract_sections += 1,
            b"Author" if ends_with(path, &["AuthorList"]) => self.author = AuthorName::default(),
            _ => {}
        }
    }

    /// `path` still ends with the element being closed
    fn close(&mut self, path: &[Vec<u8>]) {
        if ends_with(path, &["AuthorList", "Author"]) {
            if let Some(name) = self.author.display() {
                self.authors.push(name);
            }
        }
    }

    fn text(&mut self, path: &[Vec<u8>], text: &str) {
        if ends_with(path, &["MedlineCitation", "PMID"]) {
            self.pmid.push_str(text);
        } else if within(path, "ArticleTitle") {
            self.title.push_str(text);
        } else if self.abstract_sections == 1
            && within(path, "Abstract")
            && within(path, "AbstractText")
        {
            self.abstract_text.push_str(text);
        } else if within(path, "Author") {
            if within(path, "CollectiveName") {
                self.author.collective.push_str(text);
            } else if within(path, "LastName") {
                self.author.last.push_str(text);
            } else if within(path, "ForeName") {
                self.author.fore.push_str(text);
            }
        }
    }

    fn into_paper(self) -> Option<Paper> {
        let pmid = self.pmid.trim();
        let title = self.title.trim();

        if pmid.is_empty() || title.is_empty() {
            tracing::debug!(pmid = %pmid, "skipping PubMed record without PMID or title");
            return None;
        }

        let url = format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid);

        Some(
            PaperBuilder::new(title.to_string(), url, SourceType::PubMed)
                .abstract_text(self.abstract_text.trim().to_string())
                .authors(self.authors.join(", "))
                .build(),
        )
    }
}

fn ends_with(path: &[Vec<u8>], tail: &[&str]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(segment, name)| segment.as_slice() == name.as_bytes())
}

fn within(path: &[Vec<u8>], name: &str) -> bool {
    path.iter().any(|segment| segment.as_slice() == name.as_bytes())
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let search_url = self.build_search_url(query);
        let json = get_text(&self.client, &search_url, "PubMed").await?;

        let ids = Self::parse_search_response(&json)?;
        tracing::debug!(count = ids.len(), "PubMed esearch resolved identifiers");

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Fetch details for every PMID in one batch request
        let fetch_url = self.build_fetch_url(&ids);
        let xml = get_text(&self.client, &fetch_url, "PubMed").await?;

        Self::parse_fetch_response(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_ABSTRACT;
    use mockito::Matcher;

    const FETCH_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="PubMed-not-MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <ArticleTitle>Base editing in primary T cells.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">First section.</AbstractText>
          <AbstractText Label="RESULTS">Second section.</AbstractText>
        </Abstract>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Doudna</LastName><ForeName>Jennifer</ForeName><Initials>J</Initials></Author>
          <Author ValidYN="Y"><CollectiveName>CRISPR Consortium</CollectiveName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000002</PMID>
      <Article PubModel="Print">
        <ArticleTitle>Prime editing review.</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn source() -> PubMedSource {
        PubMedSource::with_client(Arc::new(HttpClient::new().unwrap()))
    }

    #[test]
    fn test_build_search_url() {
        let query = SearchQuery::new("machine learning").days(14);
        let url = source().build_search_url(&query);

        assert!(url.starts_with("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?"));
        assert!(url.contains("db=pubmed"));
        assert!(url.contains("term=machine%20learning%5BTitle%2FAbstract%5D&"));
        assert!(url.contains("datetype=edat"));
        assert!(url.contains("reldate=14"));
        assert!(url.contains("retmax=100"));
        assert!(url.contains("sort=date"));
        assert!(url.contains("retmode=json"));
    }

    #[test]
    fn test_build_term_with_review_filter() {
        let query = SearchQuery::new("CRISPR").reviews_only(true);
        assert_eq!(
            PubMedSource::build_term(&query),
            "CRISPR[Title/Abstract] AND review[Publication Type]"
        );

        let query = SearchQuery::new("CRISPR");
        assert_eq!(PubMedSource::build_term(&query), "CRISPR[Title/Abstract]");
    }

    #[test]
    fn test_build_fetch_url() {
        let ids = vec!["1".to_string(), "2".to_string()];
        let url = source().with_base_url("http://localhost/").build_fetch_url(&ids);
        assert_eq!(url, "http://localhost/efetch.fcgi?db=pubmed&id=1%2C2&retmode=xml");
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{"header":{},"esearchresult":{"count":"2","idlist":["38000001","38000002"]}}"#;
        let ids = PubMedSource::parse_search_response(json).unwrap();
        assert_eq!(ids, vec!["38000001", "38000002"]);

        assert!(PubMedSource::parse_search_response("{}").is_err());
    }

    #[test]
    fn test_parse_fetch_response() {
        let papers = PubMedSource::parse_fetch_response(FETCH_XML).unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].title, "Base editing in primary T cells.");
        assert_eq!(papers[0].r#abstract, "First section.");
        assert_eq!(papers[0].url, "https://pubmed.ncbi.nlm.nih.gov/38000001/");
        assert_eq!(
            papers[0].authors.as_deref(),
            Some("Jennifer Doudna, CRISPR Consortium")
        );
        assert_eq!(papers[0].source, SourceType::PubMed);

        assert_eq!(papers[1].r#abstract, NO_ABSTRACT);
        assert!(papers[1].authors.is_none());
    }

    #[test]
    fn test_parse_fetch_response_with_inline_markup() {
        let xml = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>38000010</PMID>
      <Article>
        <ArticleTitle>Role of <i>TP53</i> in cancer.</ArticleTitle>
        <Abstract>
          <AbstractText>Ca<sup>2+</sup> signalling &amp; H<sub>2</sub>O.</AbstractText>
        </Abstract>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="CommentOn"><PMID>12345</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>38000011</PMID>
      <Article>
        <ArticleTitle>Plain title.</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

        let papers = PubMedSource::parse_fetch_response(xml).unwrap();
        assert_eq!(papers.len(), 2);

        assert_eq!(papers[0].title, "Role of TP53 in cancer.");
        assert_eq!(papers[0].r#abstract, "Ca2+ signalling & H2O.");
        assert_eq!(papers[0].url, "https://pubmed.ncbi.nlm.nih.gov/38000010/");
        assert_eq!(papers[1].title, "Plain title.");
    }

    #[test]
    fn test_parse_fetch_response_skips_incomplete_record() {
        let xml = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation><PMID>1</PMID><Article><ArticleTitle/></Article></MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><PMID>2</PMID><Article><ArticleTitle>Kept.</ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

        let papers = PubMedSource::parse_fetch_response(xml).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Kept.");
    }

    #[test]
    fn test_parse_fetch_response_keeps_records_before_broken_xml() {
        let xml = r#"<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation><PMID>1</PMID><Article><ArticleTitle>Complete.</ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><PMID>2</PMID><Article><ArticleTitle>Broken</Abstract>"#;

        let papers = PubMedSource::parse_fetch_response(xml).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Complete.");

        assert!(PubMedSource::parse_fetch_response("<PubmedArticleSet><PubmedArticle></Oops>").is_err());
    }

    #[tokio::test]
    async fn test_search_runs_both_stages() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded(
                    "term".into(),
                    "CRISPR[Title/Abstract] AND review[Publication Type]".into(),
                ),
                Matcher::UrlEncoded("reldate".into(), "30".into()),
            ]))
            .with_body(r#"{"esearchresult":{"idlist":["38000001","38000002"]}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "38000001,38000002".into()))
            .with_body(FETCH_XML)
            .create_async()
            .await;

        let source = source().with_base_url(server.url());
        let query = SearchQuery::new("CRISPR").days(30).reviews_only(true);
        let papers = source.fetch(&query).await;

        esearch.assert_async().await;
        efetch.assert_async().await;
        assert_eq!(papers.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_fetch_stage() {
        let mut server = mockito::Server::new_async().await;
        let _esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(r#"{"esearchresult":{"idlist":[]}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = source().with_base_url(server.url());
        let papers = source.search(&SearchQuery::new("nothing")).await.unwrap();

        assert!(papers.is_empty());
        efetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_never_fails_on_network_error() {
        // Port 9 (discard) is not listening on loopback.
        let source = source().with_base_url("http://127.0.0.1:9");
        let papers = source.fetch(&SearchQuery::new("CRISPR")).await;
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_never_fails_on_malformed_payload() {
        let mut server = mockito::Server::new_async().await;
        let _esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let source = source().with_base_url(server.url());
        assert!(source.search(&SearchQuery::new("x")).await.is_err());
        assert!(source.fetch(&SearchQuery::new("x")).await.is_empty());
    }
}
