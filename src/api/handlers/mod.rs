// Copyright (c) Photogram Team
// SPDX-License-Identifier: Apache-2.0

pub mod comments;
pub mod health;
pub mod posts;
pub mod users;
