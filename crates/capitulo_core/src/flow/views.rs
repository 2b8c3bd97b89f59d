//! User-facing texts and button layouts.
use crate::catalog::book::Book;
use crate::database::types::{LibraryEntry, QueueEntry, Rating, ReadingStatistics};
use crate::flow::action::Action;
use crate::flow::reply::{Button, Delivery, Reply};
use chrono::{DateTime, Utc};
use core::fmt::Write as _;

/// Characters of a description shown in list views.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;
/// Longest text Telegram accepts in a single message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

pub(crate) const NO_TITLE: &str = "Sin título";
const UNKNOWN_AUTHOR: &str = "Autor desconocido";
const NO_DESCRIPTION: &str = "Sin descripción";
const UNKNOWN_DATE: &str = "Fecha desconocida";
const UNRATED: &str = "Sin calificar";
const DATE_FORMAT: &str = "%d-%m-%Y";

const SORRY_NO_BOOK_INFO: &str = "⚠️ Hubo un problema al obtener la información del libro.";
const EMPTY_LIBRARY_ADVICE: &str = "Tu biblioteca está vacía. ¡Empieza a agregar libros!";
const EMPTY_QUEUE_ADVICE: &str = "Tu lista de lectura está vacía. ¡Empieza a agregar libros!";
const BYE_REMOVED_SUFFIX: &str = "¡Espero encuentres algo mejor para leer pronto! 📚";

/// Cuts `text` to [`DESCRIPTION_PREVIEW_CHARS`] characters followed by `...`. Shorter texts are
/// returned unchanged.
#[must_use]
#[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

fn authors_line(authors: &[String]) -> String {
    if authors.is_empty() {
        UNKNOWN_AUTHOR.to_owned()
    } else {
        authors.join(", ")
    }
}

fn added_on(added_at: &DateTime<Utc>) -> String {
    added_at.format(DATE_FORMAT).to_string()
}

fn back_row() -> Vec<Button> {
    vec![Button::new("🔙 Volver al inicio", Action::Start)]
}

#[must_use]
#[inline]
pub fn main_menu(first_name: &str, delivery: Delivery) -> Reply {
    let name = if first_name.trim().is_empty() {
        "lector"
    } else {
        first_name
    };
    let text = format!(
        "¡Hola {name}! 👋\n\
        📚 Bienvenido a tu Biblioteca Personal.\n\n\
        Aquí puedes gestionar tus libros favoritos, llevar un seguimiento de tus lecturas y \
        descubrir nuevas obras. 🥳\n\
        ¿Qué te gustaría hacer hoy?"
    );
    Reply {
        delivery,
        ..Reply::send(text)
    }
    .with_row(vec![Button::new("📚 Buscar Libro", Action::BeginSearch)])
    .with_row(vec![Button::new("📖 Mi Biblioteca", Action::ShowLibrary)])
    .with_row(vec![Button::new("📝 Lista de Lectura", Action::ShowQueue)])
    .with_row(vec![Button::new("📊 Mis Estadísticas", Action::ShowStatistics)])
}

#[must_use]
#[inline]
pub fn search_prompt() -> Reply {
    Reply::send("Por favor, escribe el título o autor del libro que quieres buscar:")
}

#[must_use]
#[inline]
pub fn no_results() -> Reply {
    Reply::send(
        "😔 No encontramos libros que coincidan con tu búsqueda.\n\
        📌 Consejo: Prueba con otro título, autor o palabras clave.\n\
        ¡No te rindas, seguro encuentras algo genial!",
    )
}

#[must_use]
#[inline]
pub fn search_result(book: &Book) -> Reply {
    let description = book.description.as_deref().unwrap_or(NO_DESCRIPTION);
    let text = format!(
        "📖 {}\n✍️ {}\n📅 {}\n\n📝 {}\n",
        book.title.as_deref().unwrap_or(NO_TITLE),
        authors_line(&book.authors),
        book.publication_date.as_deref().unwrap_or(UNKNOWN_DATE),
        preview(description),
    );
    Reply::send(text)
        .with_row(vec![
            Button::new(
                "➕ Agregar a Biblioteca",
                Action::AddToLibrary(book.external_id.clone()),
            ),
            Button::new(
                "📝 Agregar a Lista de Lectura",
                Action::AddToQueue(book.external_id.clone()),
            ),
        ])
        .with_row(back_row())
}

#[must_use]
#[inline]
pub fn already_in_library() -> Reply {
    Reply::send("📚 Este libro ya está en tu biblioteca. No es necesario agregarlo de nuevo.")
}

#[must_use]
#[inline]
pub fn already_in_queue() -> Reply {
    Reply::send("📝 Este libro ya está en tu lista de lectura. ¡Échale un vistazo!")
}

#[must_use]
#[inline]
pub fn book_info_unavailable() -> Reply {
    Reply::send(SORRY_NO_BOOK_INFO)
}

#[must_use]
#[inline]
pub fn added_to_library(title: &str, external_id: &str) -> Reply {
    Reply::edit(format!(
        "🎉 ¡Genial! '{title}' ahora forma parte de tu biblioteca.\n📖 ¿Qué tal si lo calificas?\n"
    ))
    .with_row(vec![
        Button::new(
            "⭐ Clasificar este libro",
            Action::RateLibraryBook(external_id.to_owned()),
        ),
        Button::new("🔙 Volver al inicio", Action::Start),
    ])
}

#[must_use]
#[inline]
pub fn added_to_queue(title: &str) -> Reply {
    Reply::send(format!(
        "🎉 El libro '{title}' ha sido agregado a tu lista de lectura. ¡Disfrútalo pronto!\n"
    ))
    .with_row(back_row())
}

#[must_use]
#[inline]
pub fn empty_library() -> Reply {
    Reply::send(EMPTY_LIBRARY_ADVICE).with_row(back_row())
}

#[must_use]
#[inline]
pub fn library_card(entry: &LibraryEntry) -> Reply {
    let rating = entry
        .rating
        .map_or_else(|| UNRATED.to_owned(), |rating| rating.to_string());
    let mut text = format!(
        "📖 {}\n✍️ {}\n📅 Agregado el: {}\n⭐ Calificación: {rating}\n",
        entry.title,
        authors_line(&entry.authors),
        added_on(&entry.added_at),
    );
    if let Some(read_at) = &entry.read_at {
        writeln!(text, "✅ Leído el: {}", added_on(read_at)).ok();
    }
    let id = &entry.external_id;
    Reply::send(text)
        .with_row(vec![
            Button::new("📖 Ver Detalles", Action::ShowDetails(id.clone())),
            Button::new("❌ Eliminar", Action::RemoveFromLibrary(id.clone())),
        ])
        .with_row(vec![Button::new(
            "⭐ Calificar",
            Action::RateLibraryBook(id.clone()),
        )])
        .with_row(back_row())
}

#[must_use]
#[inline]
pub fn empty_queue() -> Reply {
    Reply::send(EMPTY_QUEUE_ADVICE).with_row(back_row())
}

#[must_use]
#[inline]
pub fn queue_card(entry: &QueueEntry) -> Reply {
    let text = format!(
        "📖 {}\n✍️ {}\n📅 Agregado el: {}\n",
        entry.title,
        authors_line(&entry.authors),
        added_on(&entry.added_at),
    );
    let id = &entry.external_id;
    Reply::send(text)
        .with_row(vec![
            Button::new("✅ Marcar como leído", Action::MarkRead(id.clone())),
            Button::new("❌ Eliminar", Action::RemoveFromQueue(id.clone())),
        ])
        .with_row(back_row())
}

/// Full detail view; the description is never truncated here. Texts longer than one message
/// are spread over several replies.
#[must_use]
#[inline]
pub fn book_details(book: &Book) -> Vec<Reply> {
    let mut text = format!(
        "Título: {}\nAutor: {}\nAño de publicación: {}\n",
        book.title.as_deref().unwrap_or(NO_TITLE),
        authors_line(&book.authors),
        book.publication_date.as_deref().unwrap_or(UNKNOWN_DATE),
    );
    if let Some(isbn) = &book.isbn13 {
        writeln!(text, "ISBN: {isbn}").ok();
    }
    let description = book
        .description
        .as_deref()
        .unwrap_or("Sin descripción disponible");
    writeln!(text, "Descripción: {description}").ok();
    split_message(&text).into_iter().map(Reply::send).collect()
}

/// Cuts `text` into pieces of at most [`MAX_MESSAGE_CHARS`] characters that concatenate back to
/// `text`. Cuts land after the last line break or space of a piece when there is one.
#[must_use]
#[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
pub fn split_message(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some((limit, _)) = rest.char_indices().nth(MAX_MESSAGE_CHARS) {
        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map_or(limit, |at| at + 1);
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece.to_owned());
        rest = tail;
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest.to_owned());
    }
    pieces
}

#[must_use]
#[inline]
pub fn details_unavailable() -> Reply {
    Reply::send("No se pudieron obtener los detalles del libro.")
}

#[must_use]
#[inline]
pub fn removed_from_library() -> Reply {
    Reply::send(format!(
        "El libro ha sido eliminado de tu biblioteca. 🗑️\n{BYE_REMOVED_SUFFIX}"
    ))
}

#[must_use]
#[inline]
pub fn removed_from_queue() -> Reply {
    Reply::send(format!(
        "El libro ha sido eliminado de tu lista de lectura. 🗑️\n{BYE_REMOVED_SUFFIX}"
    ))
}

#[must_use]
#[inline]
pub fn marked_as_read(title: &str) -> Reply {
    Reply::send(format!(
        "🎉 ¡Felicidades por terminar '{title}'! 👏. Ha sido marcado como leído y agregado a tu \
        biblioteca.\nTe invito a que lo clasifiques para recordarlo mejor 😊"
    ))
}

#[must_use]
#[inline]
pub fn not_in_queue() -> Reply {
    Reply::send("El libro no se encontró en tu lista de lectura.")
}

#[must_use]
#[inline]
pub fn nothing_to_rate() -> Reply {
    Reply::send("Tu biblioteca está vacía. Agrega algunos libros primero.")
}

#[must_use]
#[inline]
pub fn rating_menu(entries: &[LibraryEntry]) -> Reply {
    entries.iter().fold(
        Reply::send("Selecciona el libro que deseas calificar:"),
        |reply, entry| {
            reply.with_row(vec![Button::new(
                entry.title.clone(),
                Action::PickRatingTarget(entry.external_id.clone()),
            )])
        },
    )
}

/// Buttons 1 to 10, two per row.
#[must_use]
#[inline]
pub fn rating_prompt() -> Reply {
    let buttons: Vec<Button> = Rating::all()
        .map(|rating| {
            let stars = "⭐".repeat(usize::from(rating.get()));
            Button::new(format!("{rating} {stars}"), Action::Rate(rating))
        })
        .collect();
    buttons
        .chunks(2)
        .fold(
            Reply::send("Selecciona una calificación para este libro:"),
            |reply, pair| reply.with_row(pair.to_vec()),
        )
        .with_row(back_row())
}

#[must_use]
#[inline]
pub fn rating_saved(rating: Rating) -> Reply {
    Reply::send(format!("Gracias por calificar el libro con {rating} ⭐."))
}

#[must_use]
#[inline]
pub fn rating_target_unknown() -> Reply {
    Reply::send("No se pudo identificar el libro a calificar. Inténtalo nuevamente.")
}

#[must_use]
#[inline]
pub fn rating_target_missing() -> Reply {
    Reply::send("Ese libro ya no está en tu biblioteca, así que no se pudo guardar la calificación.")
        .with_row(back_row())
}

#[must_use]
#[inline]
pub fn rating_hint() -> Reply {
    Reply::send("Elige una calificación del 1 al 10 con los botones, o escribe el número.")
}

#[must_use]
#[inline]
pub fn idle_hint() -> Reply {
    Reply::send("No estoy esperando ningún mensaje ahora mismo. Usa /start para ver el menú.")
}

#[must_use]
#[inline]
pub fn statistics(stats: &ReadingStatistics) -> Reply {
    let mut text = format!(
        "📊 Tus Estadísticas de Lectura:\n\n\
        📚 Total de libros: {}\n\
        📖 Libros pendientes: {}\n\
        ⭐ Calificación promedio: {:.1}/10\n\n\
        📘 Géneros favoritos:\n",
        stats.total_books, stats.pending_count, stats.average_rating,
    );
    if stats.top_categories.is_empty() {
        text.push_str("No se han registrado géneros.\n");
    } else {
        for (category, count) in &stats.top_categories {
            writeln!(text, "- 📚 {category}: {count} libros").ok();
        }
    }
    text.push_str(
        "\n🚀 ¡Sigue así! Cada libro leído es un paso más hacia un mundo de conocimiento y \
        aventuras. 🚀",
    );
    Reply::edit(text).with_row(back_row())
}

/// Sent when handling an event failed unexpectedly.
#[must_use]
#[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
pub fn unexpected_failure() -> Reply {
    Reply::send("⚠️ Algo salió mal. Inténtalo de nuevo más tarde.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_descriptions_are_kept_whole() {
        assert_eq!(preview("Breve."), "Breve.");
        let exact = "a".repeat(DESCRIPTION_PREVIEW_CHARS);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn long_descriptions_are_cut_on_characters() {
        let long = "ñ".repeat(DESCRIPTION_PREVIEW_CHARS + 50);
        let cut = preview(&long);
        assert_eq!(cut, format!("{}...", "ñ".repeat(DESCRIPTION_PREVIEW_CHARS)));
    }

    #[test]
    fn search_result_uses_fallbacks() {
        let book = Book {
            external_id: "id_1".to_owned(),
            ..Book::default()
        };
        let reply = search_result(&book);
        assert_eq!(
            reply.text,
            "📖 Sin título\n✍️ Autor desconocido\n📅 Fecha desconocida\n\n📝 Sin descripción\n"
        );
        let actions: Vec<&Action> = reply.actions().collect();
        assert_eq!(
            actions,
            vec![
                &Action::AddToLibrary("id_1".to_owned()),
                &Action::AddToQueue("id_1".to_owned()),
                &Action::Start,
            ]
        );
    }

    #[test]
    fn rating_prompt_lays_out_ten_buttons_and_back() {
        let reply = rating_prompt();
        assert_eq!(reply.keyboard.len(), 6);
        assert!(reply.keyboard[..5].iter().all(|row| row.len() == 2));
        assert_eq!(reply.keyboard[0][0].label, "1 ⭐");
        assert_eq!(reply.keyboard[5][0].action, Action::Start);
    }

    #[test]
    fn statistics_without_categories() {
        let stats = ReadingStatistics {
            total_books: 2,
            pending_count: 1,
            average_rating: 4.0,
            top_categories: Vec::new(),
        };
        let reply = statistics(&stats);
        assert_eq!(reply.delivery, Delivery::Edit);
        assert!(reply.text.contains("📚 Total de libros: 2\n"));
        assert!(reply.text.contains("⭐ Calificación promedio: 4.0/10\n"));
        assert!(reply.text.contains("No se han registrado géneros."));
    }

    #[test]
    fn long_details_are_spread_over_several_messages() {
        let description = "palabra ".repeat(700);
        let book = Book {
            external_id: "larga".to_owned(),
            title: Some("Rayuela".to_owned()),
            description: Some(description.clone()),
            ..Book::default()
        };

        let replies = book_details(&book);

        assert_eq!(replies.len(), 2);
        assert!(
            replies
                .iter()
                .all(|reply| reply.text.chars().count() <= MAX_MESSAGE_CHARS)
        );
        let joined: String = replies.iter().map(|reply| reply.text.as_str()).collect();
        assert!(joined.starts_with("Título: Rayuela\n"));
        assert!(joined.contains(&description));
    }

    #[test]
    fn split_message_cuts_on_characters_without_spaces() {
        let text = "ñ".repeat(MAX_MESSAGE_CHARS * 2 + 10);

        let pieces = split_message(&text);

        let lengths: Vec<usize> = pieces.iter().map(|piece| piece.chars().count()).collect();
        assert_eq!(lengths, vec![MAX_MESSAGE_CHARS, MAX_MESSAGE_CHARS, 10]);
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn short_messages_stay_whole() {
        assert_eq!(split_message("hola"), vec!["hola".to_owned()]);
        assert_eq!(split_message(""), vec![String::new()]);
        let exact = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(split_message(&exact), vec![exact.clone()]);
    }

    #[test]
    fn main_menu_greets_anonymous_readers() {
        let reply = main_menu("", Delivery::Send);
        assert!(reply.text.starts_with("¡Hola lector! 👋\n"));
        assert_eq!(reply.keyboard.len(), 4);
    }
}
