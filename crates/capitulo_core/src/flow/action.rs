use crate::database::types::Rating;
use core::fmt;
use core::str::FromStr;

const START: &str = "start";
const SHOW_LIBRARY: &str = "mi_biblioteca";
const SHOW_QUEUE: &str = "lista_lectura";
const SHOW_STATISTICS: &str = "estadisticas";
const BEGIN_SEARCH: &str = "buscar_libro";
const BEGIN_RATING: &str = "calificar_libro";

const ADD_TO_LIBRARY: &str = "add_biblioteca_";
const ADD_TO_QUEUE: &str = "add_lista_";
const REMOVE_FROM_LIBRARY: &str = "eliminar_biblioteca_";
const SHOW_DETAILS: &str = "detalles_biblioteca_";
const RATE_LIBRARY_BOOK: &str = "calificar_biblioteca_";
const PICK_RATING_TARGET: &str = "rate_";
const MARK_READ: &str = "marcar_leido_";
const REMOVE_FROM_QUEUE: &str = "eliminar_lista_";
const RATE: &str = "calificacion_";

/// A button press, decoded from its callback identifier.
///
/// Identifiers are either an exact keyword (`mi_biblioteca`) or a prefix followed by a catalog
/// book id (`add_biblioteca_<id>`). Book ids may themselves contain underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    ShowLibrary,
    ShowQueue,
    ShowStatistics,
    BeginSearch,
    BeginRating,
    AddToLibrary(String),
    AddToQueue(String),
    RemoveFromLibrary(String),
    ShowDetails(String),
    /// "Rate" button on a library card.
    RateLibraryBook(String),
    /// A book chosen from the rating menu.
    PickRatingTarget(String),
    MarkRead(String),
    RemoveFromQueue(String),
    Rate(Rating),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised callback identifier {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    #[allow(clippy::missing_inline_in_public_items, reason = "Called on every button press")]
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let exact = match data {
            START => Some(Self::Start),
            SHOW_LIBRARY => Some(Self::ShowLibrary),
            SHOW_QUEUE => Some(Self::ShowQueue),
            SHOW_STATISTICS => Some(Self::ShowStatistics),
            BEGIN_SEARCH => Some(Self::BeginSearch),
            BEGIN_RATING => Some(Self::BeginRating),
            _ => None,
        };
        if let Some(action) = exact {
            return Ok(action);
        }

        if let Some(value) = data.strip_prefix(RATE) {
            return value
                .parse::<u8>()
                .ok()
                .and_then(Rating::new)
                .map(Self::Rate)
                .ok_or_else(|| UnknownAction(data.to_owned()));
        }

        let with_book: [(&str, fn(String) -> Self); 8] = [
            (ADD_TO_LIBRARY, Self::AddToLibrary),
            (ADD_TO_QUEUE, Self::AddToQueue),
            (REMOVE_FROM_LIBRARY, Self::RemoveFromLibrary),
            (SHOW_DETAILS, Self::ShowDetails),
            (RATE_LIBRARY_BOOK, Self::RateLibraryBook),
            (PICK_RATING_TARGET, Self::PickRatingTarget),
            (MARK_READ, Self::MarkRead),
            (REMOVE_FROM_QUEUE, Self::RemoveFromQueue),
        ];
        with_book
            .iter()
            .find_map(|&(prefix, build)| {
                data.strip_prefix(prefix)
                    .filter(|book_id| !book_id.is_empty())
                    .map(|book_id| build(book_id.to_owned()))
            })
            .ok_or_else(|| UnknownAction(data.to_owned()))
    }
}

impl fmt::Display for Action {
    #[allow(clippy::missing_inline_in_public_items, reason = "Called when rendering buttons")]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str(START),
            Self::ShowLibrary => f.write_str(SHOW_LIBRARY),
            Self::ShowQueue => f.write_str(SHOW_QUEUE),
            Self::ShowStatistics => f.write_str(SHOW_STATISTICS),
            Self::BeginSearch => f.write_str(BEGIN_SEARCH),
            Self::BeginRating => f.write_str(BEGIN_RATING),
            Self::AddToLibrary(id) => write!(f, "{ADD_TO_LIBRARY}{id}"),
            Self::AddToQueue(id) => write!(f, "{ADD_TO_QUEUE}{id}"),
            Self::RemoveFromLibrary(id) => write!(f, "{REMOVE_FROM_LIBRARY}{id}"),
            Self::ShowDetails(id) => write!(f, "{SHOW_DETAILS}{id}"),
            Self::RateLibraryBook(id) => write!(f, "{RATE_LIBRARY_BOOK}{id}"),
            Self::PickRatingTarget(id) => write!(f, "{PICK_RATING_TARGET}{id}"),
            Self::MarkRead(id) => write!(f, "{MARK_READ}{id}"),
            Self::RemoveFromQueue(id) => write!(f, "{REMOVE_FROM_QUEUE}{id}"),
            Self::Rate(rating) => write!(f, "{RATE}{rating}"),
        }
    }
}
