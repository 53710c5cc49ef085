//! Deferred query execution
//!
//! A `DeferredQuery` is a query bound to a client, a model and a dialect.
//! Composing it never performs I/O. Each terminal call (`to_list`, `first`,
//! or polling `stream`) issues exactly one request.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::filters::Predicate;
use super::orderby::Direction;
use super::projection::Projection;
use super::query::Query;
use super::result::QueryResponse;
use super::translator::{QueryString, Translator};
use super::Dialect;
use crate::api::client::ClientInner;
use crate::api::error::{Error, Result, TranslationError};
use crate::api::metadata::map_fragment;
use crate::api::transport::HttpRequest;

pub struct DeferredQuery<T> {
    pub(crate) client: Arc<ClientInner>,
    pub(crate) model: String,
    pub(crate) dialect: Dialect,
    pub(crate) query: Query,
    pub(crate) _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for DeferredQuery<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            model: self.model.clone(),
            dialect: self.dialect,
            query: self.query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for DeferredQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQuery")
            .field("model", &self.model)
            .field("dialect", &self.dialect)
            .field("query", &self.query)
            .finish()
    }
}

/// Lazy stream progress
enum State {
    Pending(Fetch),
    Yielding(Cursor),
    Done,
}

/// Everything needed to issue the request, detached from `&self`
struct Fetch {
    client: Arc<ClientInner>,
    model: String,
    dialect: Dialect,
    query: Query,
}

struct Cursor {
    client: Arc<ClientInner>,
    model: String,
    dialect: Dialect,
    items: std::vec::IntoIter<Value>,
    index: usize,
}

impl<T> DeferredQuery<T> {
    fn with_query(&self, query: Query) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    pub fn filter(&self, predicate: Predicate) -> Self {
        self.with_query(self.query.filter(predicate))
    }

    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Self {
        self.with_query(self.query.order_by(field, direction))
    }

    pub fn select<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_query(self.query.select(fields))
    }

    pub fn expand(&self, field: impl Into<String>, nested: Projection) -> Self {
        self.with_query(self.query.expand(field, nested))
    }

    pub fn skip(&self, skip: u32) -> Self {
        self.with_query(self.query.skip(skip))
    }

    pub fn top(&self, top: u32) -> Self {
        self.with_query(self.query.top(top))
    }

    /// Replace the whole query, e.g. one composed ahead of time
    pub fn apply(&self, query: Query) -> Self {
        self.with_query(query)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render the query string without sending anything
    pub fn translate(&self) -> Result<QueryString> {
        let translator = Translator::new(self.client.descriptors.as_ref(), self.dialect);
        Ok(translator.translate(&self.model, &self.query)?)
    }

    /// Full request URL
    pub fn url(&self) -> Result<String> {
        request_url(&self.client, &self.model, self.dialect, &self.query)
    }

    fn fetch(&self) -> Fetch {
        Fetch {
            client: Arc::clone(&self.client),
            model: self.model.clone(),
            dialect: self.dialect,
            query: self.query.clone(),
        }
    }
}

impl<T: DeserializeOwned> DeferredQuery<T> {
    /// Lazy, cancellable sequence of results
    ///
    /// The request is sent on the first poll. Dropping the stream early is not
    /// an error and cancels a request still in flight. A result that fails to
    /// map ends the stream with an error naming the item and field.
    pub fn stream(&self) -> BoxStream<'static, Result<T>>
    where
        T: Send + 'static,
    {
        stream::unfold(State::Pending(self.fetch()), |state| async move {
            match state {
                State::Pending(fetch) => match fetch.run().await {
                    Ok(cursor) => advance::<T>(cursor),
                    Err(e) => Some((Err(e), State::Done)),
                },
                State::Yielding(cursor) => advance::<T>(cursor),
                State::Done => None,
            }
        })
        .boxed()
    }

    /// Execute now and collect every result in server order
    pub async fn to_list(&self) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        self.stream().try_collect().await
    }

    /// First result of the query with `$top=1`
    pub async fn first(&self) -> Result<Option<T>>
    where
        T: Send + 'static,
    {
        let mut results = self.top(1).to_list().await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.swap_remove(0))
        })
    }
}

impl Fetch {
    async fn run(self) -> Result<Cursor> {
        // translation errors surface here, before any I/O
        let url = request_url(&self.client, &self.model, self.dialect, &self.query)?;
        log::debug!("Querying {} via {}: {}", self.model, self.dialect, url);

        let request = HttpRequest::get(url).header("Accept", self.dialect.accept_header());
        let response = self.client.send(self.dialect, request).await?;
        let page = QueryResponse::parse(&response.body)?;

        log::info!("Fetched {} {} item(s)", page.len(), self.model);
        if let Some(next) = &page.next_link {
            log::debug!("More results available at {}", next);
        }

        Ok(Cursor {
            client: self.client,
            model: self.model,
            dialect: self.dialect,
            items: page.items.into_iter(),
            index: 0,
        })
    }
}

/// Map the next buffered item, or end the stream
fn advance<T: DeserializeOwned>(mut cursor: Cursor) -> Option<(Result<T>, State)> {
    let item = cursor.items.next()?;
    match map_item(&cursor, &item) {
        Ok(value) => {
            cursor.index += 1;
            Some((Ok(value), State::Yielding(cursor)))
        }
        Err(e) => Some((Err(e), State::Done)),
    }
}

fn map_item<T: DeserializeOwned>(cursor: &Cursor, item: &Value) -> Result<T> {
    let provider = cursor.client.descriptors.as_ref();
    let model = provider
        .describe(&cursor.model)
        .ok_or_else(|| TranslationError::UnknownModel {
            model: cursor.model.clone(),
        })?;
    let context = || format!("item {}", cursor.index);

    map_fragment(item, model, cursor.dialect, provider)
        .and_then(|record| record.into_typed())
        .map_err(|e| Error::mapping(context(), e))
}

fn request_url(client: &ClientInner, model: &str, dialect: Dialect, query: &Query) -> Result<String> {
    let provider = client.descriptors.as_ref();
    let suffix = Translator::new(provider, dialect).translate(model, query)?;

    // translate() has already checked the model and its collection
    let path = provider
        .describe(model)
        .and_then(|m| m.collection(dialect))
        .map(|c| c.path.trim_start_matches('/').to_string())
        .ok_or_else(|| TranslationError::ModelNotInDialect {
            model: model.to_string(),
            dialect,
        })?;

    Ok(format!(
        "{}/{}{}",
        client.config.base_url(dialect),
        path,
        suffix.to_encoded_suffix()
    ))
}
