/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Portacarte, a mutual-TLS object storage upload client.
 *
 * Portacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Portacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Portacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP/1.1 plumbing for the upload exchange: chunked request-body framing and
//! response status parsing. The client consumes only the status line and
//! headers; response bodies are never parsed.

mod chunked;
mod response;

pub use chunked::ChunkedWriter;
pub use response::{ParseState, StatusParser};
