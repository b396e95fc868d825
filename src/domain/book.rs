use serde::Serialize;

use super::value_objects::required_text;
use super::{BookId, InventoryError, Isbn, Quantity, ValidationError};

/// Book集約 - 1タイトル分の所蔵
///
/// 不変条件：0 <= available <= quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Isbn,
    pub quantity: Quantity,
    available: u32,
}

impl Book {
    /// 永続化された値から復元する
    ///
    /// # エラー
    /// 在庫数が不変条件を満たさない場合は`InventoryError::InvalidCount`
    pub fn restore(
        book_id: BookId,
        title: String,
        author: String,
        isbn: Isbn,
        quantity: Quantity,
        available: i64,
    ) -> Result<Self, InventoryError> {
        if available < 0 || available > i64::from(quantity.value()) {
            return Err(InventoryError::InvalidCount {
                quantity: i64::from(quantity.value()),
                available,
            });
        }

        Ok(Self {
            book_id,
            title,
            author,
            isbn,
            quantity,
            available: available as u32,
        })
    }

    /// 貸出可能な冊数
    pub fn available(&self) -> u32 {
        self.available
    }

    /// 貸出中の冊数
    pub fn on_loan(&self) -> u32 {
        self.quantity.value() - self.available
    }

    pub fn is_available(&self) -> bool {
        self.available > 0
    }
}

/// 純粋関数：書籍を登録する
///
/// ビジネスルール：
/// - タイトル・著者・ISBNは必須
/// - 冊数は1以上
/// - 登録直後は全冊が貸出可能
pub fn add_book(title: &str, author: &str, isbn: &str, quantity: i64) -> Result<Book, ValidationError> {
    let title = required_text("title", title)?;
    let author = required_text("author", author)?;
    let isbn = Isbn::try_from(isbn)?;
    let quantity = Quantity::try_from(quantity)?;

    Ok(Book {
        book_id: BookId::new(),
        title,
        author,
        isbn,
        quantity,
        available: quantity.value(),
    })
}

/// 純粋関数：1冊を貸出に回す
///
/// 副作用なし。貸出可能数を1減らした新しいBookを返す。
pub fn check_out(book: &Book) -> Result<Book, InventoryError> {
    if book.available == 0 {
        return Err(InventoryError::NoCopiesAvailable);
    }

    Ok(Book {
        available: book.available - 1,
        ..book.clone()
    })
}

/// 純粋関数：1冊を書架に戻す
///
/// 副作用なし。貸出可能数を1増やした新しいBookを返す。
pub fn check_in(book: &Book) -> Result<Book, InventoryError> {
    if book.available >= book.quantity.value() {
        return Err(InventoryError::AllCopiesOnShelf);
    }

    Ok(Book {
        available: book.available + 1,
        ..book.clone()
    })
}
