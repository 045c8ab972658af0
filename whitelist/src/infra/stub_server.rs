// This file is part of anchor-whitelist.
// Copyright (C) 2025 anchor-whitelist contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Local HTTP/1.1 server answering requests with canned responses.

use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task,
    time::sleep,
};

/// Serve requests on a local port and return the base URL. `respond` gets the path and body of
/// each request and returns status and JSON body; `None` means the request never gets an
/// answer.
pub async fn serve<F>(respond: F) -> String
where
    F: Fn(&str, &str) -> Option<(u16, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener can be bound");
    let url = format!("http://{}", listener.local_addr().expect("listener has address"));
    let respond = Arc::new(respond);

    task::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let respond = respond.clone();
            task::spawn(async move { handle(stream, respond.as_ref()).await });
        }
    });

    url
}

/// Serve fixed `(path, status, body)` responses; requests for any other path stall.
pub async fn serve_paths(responses: Vec<(&'static str, u16, String)>) -> String {
    serve(move |path, _| {
        responses
            .iter()
            .find(|(p, ..)| *p == path)
            .map(|(_, status, body)| (*status, body.to_owned()))
    })
    .await
}

async fn handle<F>(mut stream: TcpStream, respond: &F)
where
    F: Fn(&str, &str) -> Option<(u16, String)>,
{
    let mut request = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        if let Some(n) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break n + 4;
        }
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    }

    let path = head.split_whitespace().nth(1).unwrap_or_default();
    let body = String::from_utf8_lossy(&request[header_end..]);

    match respond(path, &*body) {
        Some((status, body)) => {
            let response = format!(
                "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }

        None => sleep(Duration::from_secs(60)).await,
    }
}
